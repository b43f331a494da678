use crate::{
    types::{
        config::{AudioConfigRequest, Settings},
        error::{Error, Result},
        interface::Interface,
        pipewire::{Link, LinkStatus, Port, Target},
        process::{CommandLine, CommandOutput, RecordOutput, Termination},
    },
    utils::{
        command::{Mode, build_cat_command},
        interfaces::list_interfaces,
        pipewire::LinkManager,
        runner::{Runner, SystemRunner},
        targets::list_targets,
    },
};
use std::{collections::BTreeMap, path::Path, sync::Arc, time::Duration};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{info, warn};

/// A playback or recording running in the background.
pub struct TaskHandle<T> {
    task: JoinHandle<Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Waits for the process. A cancelled task yields [`Error::Task`].
    pub async fn wait(self) -> Result<T> {
        self.task.await?
    }

    /// Drops the running process, which kills it.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Plays and records through pw-cat, lists the graph through pw-cli and
/// pw-link. Controllers share nothing, so any number of them can run side
/// by side.
pub struct Controller {
    settings: Settings,
    runner: Arc<dyn Runner>,
    links: LinkManager,
    active: Option<AbortHandle>,
}

impl Controller {
    pub fn new(settings: Settings, runner: Arc<dyn Runner>) -> Self {
        let links = LinkManager::new(Arc::clone(&runner), settings.binaries.link.clone());

        Controller {
            settings,
            runner,
            links,
            active: None,
        }
    }

    /// A controller that spawns real processes.
    pub fn system(settings: Settings) -> Self {
        Controller::new(settings, Arc::new(SystemRunner))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn links(&self) -> &LinkManager {
        &self.links
    }

    /// Validates before anything is spawned; an invalid request never
    /// reaches the runner.
    fn prepare(
        &self,
        mode: Mode,
        path: &Path,
        request: &AudioConfigRequest,
    ) -> Result<CommandLine> {
        let config = request.merge(&self.settings.defaults).validate()?;
        Ok(build_cat_command(
            &self.settings.binaries.cat,
            mode,
            &config,
            path,
        ))
    }

    /// Plays `path` and waits for pw-cat to exit. A non-zero exit is
    /// [`Error::ProcessFailed`] carrying pw-cat's stderr.
    pub async fn play(
        &self,
        path: impl AsRef<Path>,
        request: &AudioConfigRequest,
    ) -> Result<CommandOutput> {
        let command = self.prepare(Mode::Playback, path.as_ref(), request)?;
        info!("Playing {}", path.as_ref().display());
        self.runner.run(&command).await?.into_result()
    }

    /// Records into `path` for `seconds` (the configured default when
    /// `None`). Hitting the deadline is how a recording normally ends, so it
    /// is reported through [`RecordOutput::termination`], never as an error.
    pub async fn record(
        &self,
        path: impl AsRef<Path>,
        request: &AudioConfigRequest,
        seconds: Option<u64>,
    ) -> Result<RecordOutput> {
        let command = self.prepare(Mode::Record, path.as_ref(), request)?;
        let deadline = self.record_deadline(seconds);
        info!("Recording {} for {:?}", path.as_ref().display(), deadline);

        let record = self
            .runner
            .run_with_timeout(&command, deadline, self.settings.terminate_grace())
            .await?;
        log_record_outcome(&record);
        Ok(record)
    }

    /// Starts playback without waiting for it.
    ///
    /// Only one background task per controller: while the previous one has
    /// not finished this returns [`Error::Busy`] instead of replacing it.
    /// Must be called from within a Tokio runtime.
    pub fn spawn_play(
        &mut self,
        path: impl AsRef<Path>,
        request: &AudioConfigRequest,
    ) -> Result<TaskHandle<CommandOutput>> {
        self.ensure_idle()?;
        let command = self.prepare(Mode::Playback, path.as_ref(), request)?;
        let runner = Arc::clone(&self.runner);

        let task = tokio::spawn(async move { runner.run(&command).await?.into_result() });
        Ok(self.track(task))
    }

    /// Background counterpart of [`Controller::record`]. Same one-at-a-time
    /// rule as [`Controller::spawn_play`].
    pub fn spawn_record(
        &mut self,
        path: impl AsRef<Path>,
        request: &AudioConfigRequest,
        seconds: Option<u64>,
    ) -> Result<TaskHandle<RecordOutput>> {
        self.ensure_idle()?;
        let command = self.prepare(Mode::Record, path.as_ref(), request)?;
        let deadline = self.record_deadline(seconds);
        let grace = self.settings.terminate_grace();
        let runner = Arc::clone(&self.runner);

        let task = tokio::spawn(async move {
            let record = runner.run_with_timeout(&command, deadline, grace).await?;
            log_record_outcome(&record);
            Ok::<_, Error>(record)
        });
        Ok(self.track(task))
    }

    /// Cancels the outstanding background task, if any. Returns whether
    /// there was one still running.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_busy() {
            return Err(Error::Busy);
        }
        Ok(())
    }

    fn track<T>(&mut self, task: JoinHandle<Result<T>>) -> TaskHandle<T> {
        self.active = Some(task.abort_handle());
        TaskHandle { task }
    }

    fn record_deadline(&self, seconds: Option<u64>) -> Duration {
        seconds
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.settings.record_duration())
    }

    /// Lines of `pw-cli --version` after the program name, e.g.
    /// `Compiled with libpipewire 1.0.5`.
    pub async fn version(&self) -> Result<Vec<String>> {
        let command = CommandLine::new(&self.settings.binaries.cli).arg("--version");
        let output = self.runner.run(&command).await?.into_result()?;

        Ok(output
            .stdout
            .lines()
            .skip(1)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    /// Queries the live graph; with `type_filter` only interfaces of that
    /// type (`Node`, `Client`, `Device`, ...) are returned.
    pub async fn list_interfaces(
        &self,
        type_filter: Option<&str>,
    ) -> Result<BTreeMap<u32, Interface>> {
        let listing =
            list_interfaces(self.runner.as_ref(), &self.settings.binaries.cli, type_filter)
                .await?;
        Ok(listing.interfaces)
    }

    pub async fn list_targets(&self, mode: Mode) -> Result<Vec<Target>> {
        list_targets(self.runner.as_ref(), &self.settings.binaries.cat, mode).await
    }

    pub async fn list_outputs(&self) -> Result<Vec<Port>> {
        self.links.list_outputs().await
    }

    pub async fn list_inputs(&self) -> Result<Vec<Port>> {
        self.links.list_inputs().await
    }

    pub async fn list_links(&self) -> Result<Vec<Link>> {
        self.links.list_links().await
    }

    pub async fn connect(&self, a: &Port, b: &Port) -> Result<LinkStatus> {
        self.links.connect(a, b).await
    }

    pub async fn disconnect(&self, a: &Port, b: &Port) -> Result<LinkStatus> {
        self.links.disconnect(a, b).await
    }

    pub async fn disconnect_link(&self, link: &Link) -> Result<LinkStatus> {
        self.links.disconnect_link(link).await
    }
}

fn log_record_outcome(record: &RecordOutput) {
    match record.termination {
        Termination::Exited if !record.output.success() => warn!(
            "Recorder exited early with {:?}: {}",
            record.output.code,
            record.output.stderr.trim()
        ),
        Termination::Exited => info!("Recorder exited on its own"),
        Termination::Terminated => info!("Recording stopped at the deadline"),
        Termination::Killed => warn!("Recorder had to be killed"),
    }
}
