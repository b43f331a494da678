use crate::types::error::{Error, Result};
use serde::Serialize;
use std::{ffi::OsString, fmt};

/// Program plus argument vector. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<OsString>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        CommandLine {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// What a finished child process left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub command: String,
    /// `None` when the process was ended by a signal.
    pub code: Option<i32>,
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turns a non-zero exit into [`Error::ProcessFailed`].
    pub fn into_result(self) -> Result<CommandOutput> {
        if self.success() {
            return Ok(self);
        }

        Err(self.into_error())
    }

    pub fn into_error(self) -> Error {
        Error::ProcessFailed {
            command: self.command,
            code: self.code,
            stdout: self.stdout,
            stderr: self.stderr,
        }
    }
}

/// How a process run under a deadline came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// Exited on its own before the deadline.
    Exited,
    /// Deadline hit, stopped by SIGTERM.
    Terminated,
    /// Ignored SIGTERM for the whole grace period and was SIGKILLed.
    Killed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutput {
    pub output: CommandOutput,
    pub termination: Termination,
}

impl RecordOutput {
    /// The deadline ended the process, either by SIGTERM or SIGKILL.
    pub fn timed_out(&self) -> bool {
        self.termination != Termination::Exited
    }
}
