use crate::{
    types::{
        error::Result,
        process::{CommandLine, CommandOutput, RecordOutput, Termination},
    },
    utils::runner::Runner,
};
use async_trait::async_trait;
use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

/// Records every command line it is asked to run and answers from a queue
/// of canned outputs (an empty successful run once the queue is drained).
#[derive(Default, Clone)]
pub(crate) struct SpyRunner {
    calls: Arc<Mutex<Vec<CommandLine>>>,
    responses: Arc<Mutex<VecDeque<(Option<i32>, String, String)>>>,
}

impl SpyRunner {
    pub(crate) fn new() -> Self {
        SpyRunner::default()
    }

    pub(crate) fn respond(self, code: i32, stdout: &str, stderr: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back((Some(code), stdout.to_string(), stderr.to_string()));
        self
    }

    pub(crate) fn calls(&self) -> Vec<CommandLine> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_strings(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }

    fn next_output(&self, command: &CommandLine) -> CommandOutput {
        self.calls.lock().unwrap().push(command.clone());
        let (code, stdout, stderr) = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((Some(0), String::new(), String::new()));

        CommandOutput {
            command: command.to_string(),
            code,
            signal: None,
            stdout,
            stderr,
        }
    }
}

#[async_trait]
impl Runner for SpyRunner {
    async fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        Ok(self.next_output(command))
    }

    async fn run_with_timeout(
        &self,
        command: &CommandLine,
        _deadline: Duration,
        _grace: Duration,
    ) -> Result<RecordOutput> {
        let mut output = self.next_output(command);
        output.code = None;
        output.signal = Some(15);

        Ok(RecordOutput {
            output,
            termination: Termination::Terminated,
        })
    }
}

/// Collects formatted log lines written through a scoped subscriber.
#[derive(Default, Clone)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a subscriber that records every event at `WARN` or above
/// and returns its result along with the captured text.
pub(crate) fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (result, logs)
}
