use crate::types::{
    error::{Error, Result},
    process::{CommandLine, CommandOutput, RecordOutput, Termination},
};
use async_trait::async_trait;
use nix::{
    sys::signal::{Signal, kill},
    unistd::Pid,
};
use std::{
    io::ErrorKind,
    os::unix::process::ExitStatusExt,
    process::{ExitStatus, Stdio},
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, Command},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, info, warn};

/// Executes command lines on behalf of the controller and the link manager.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Runs to completion and captures both output streams. A non-zero exit
    /// is not an error at this level.
    async fn run(&self, command: &CommandLine) -> Result<CommandOutput>;

    /// Like [`Runner::run`], but once `deadline` passes the process gets
    /// SIGTERM, and SIGKILL if it is still alive after `grace`.
    async fn run_with_timeout(
        &self,
        command: &CommandLine,
        deadline: Duration,
        grace: Duration,
    ) -> Result<RecordOutput>;
}

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn spawn(command: &CommandLine) -> Result<Child> {
        debug!("Running {}", command);

        Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| spawn_error(&command.program, err))
    }
}

#[async_trait]
impl Runner for SystemRunner {
    async fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        let child = Self::spawn(command)?;
        let output = child.wait_with_output().await?;

        Ok(command_output(
            command,
            output.status,
            &output.stdout,
            &output.stderr,
        ))
    }

    async fn run_with_timeout(
        &self,
        command: &CommandLine,
        deadline: Duration,
        grace: Duration,
    ) -> Result<RecordOutput> {
        let mut child = Self::spawn(command)?;
        let stdout_reader = read_pipe(child.stdout.take());
        let stderr_reader = read_pipe(child.stderr.take());

        let (status, termination) = match timeout(deadline, child.wait()).await {
            Ok(status) => (status?, Termination::Exited),
            Err(_) => {
                info!(
                    "{} still running after {:?}, sending SIGTERM",
                    command.program, deadline
                );
                send_sigterm(&child)?;

                match timeout(grace, child.wait()).await {
                    Ok(status) => (status?, Termination::Terminated),
                    Err(_) => {
                        warn!(
                            "{} ignored SIGTERM for {:?}, killing it",
                            command.program, grace
                        );
                        child.kill().await?;
                        (child.wait().await?, Termination::Killed)
                    }
                }
            }
        };

        // A grandchild may still hold the pipes open; do not wait on it forever.
        let stdout = collect_pipe(stdout_reader, grace).await;
        let stderr = collect_pipe(stderr_reader, grace).await;

        Ok(RecordOutput {
            output: command_output(command, status, &stdout, &stderr),
            termination,
        })
    }
}

fn spawn_error(program: &str, err: std::io::Error) -> Error {
    match err.kind() {
        ErrorKind::NotFound => Error::ExecutableNotFound(program.to_string()),
        ErrorKind::PermissionDenied => Error::PermissionDenied(program.to_string()),
        _ => Error::Io(err),
    }
}

fn send_sigterm(child: &Child) -> Result<()> {
    // Already reaped, nothing left to signal.
    let Some(pid) = child.id() else {
        return Ok(());
    };

    let pid = i32::try_from(pid).map_err(|_| Error::Io(ErrorKind::InvalidInput.into()))?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(|errno| Error::Io(errno.into()))
}

fn read_pipe<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe
            && let Err(err) = pipe.read_to_end(&mut buffer).await
        {
            debug!("Failed to read child output: {}", err);
        }
        buffer
    })
}

async fn collect_pipe(reader: JoinHandle<Vec<u8>>, limit: Duration) -> Vec<u8> {
    let abort = reader.abort_handle();
    match timeout(limit, reader).await {
        Ok(Ok(buffer)) => buffer,
        Ok(Err(err)) => {
            debug!("Output reader failed: {}", err);
            Vec::new()
        }
        Err(_) => {
            abort.abort();
            Vec::new()
        }
    }
}

fn command_output(
    command: &CommandLine,
    status: ExitStatus,
    stdout: &[u8],
    stderr: &[u8],
) -> CommandOutput {
    let output = CommandOutput {
        command: command.to_string(),
        code: status.code(),
        signal: status.signal(),
        stdout: String::from_utf8_lossy(stdout).into_owned(),
        stderr: String::from_utf8_lossy(stderr).into_owned(),
    };

    debug!(
        "{} finished: code={:?} signal={:?}",
        command.program, output.code, output.signal
    );
    output
}
