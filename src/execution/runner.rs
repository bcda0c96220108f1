//! Command runner: spawn, supervise, tear down.

use std::io::Write;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::command::CommandSpec;
use super::interrupt::{next_interrupt, InterruptListener};
use super::result::{ExecutionResult, Status};
use crate::error::RunError;
use crate::process::ChildProcess;
use crate::pump::{OutputPump, PumpError, RunningPump};
use crate::Result;

/// Default interval between supervision checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default time a process group gets between SIGTERM and SIGKILL.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(2);

/// Default time allowed for the pump to finish once the child is gone.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Runner tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Upper bound on how late a timeout or pump failure is noticed.
    pub poll_interval: Duration,
    /// Time between the polite and the forceful group kill.
    pub kill_grace: Duration,
    /// Time the pump gets to reach EOF after the child is gone before the
    /// group is killed to release the pipe.
    pub drain_grace: Duration,
    /// Abort on SIGINT/SIGTERM (Ctrl-C on Windows) delivered to this process.
    ///
    /// Off by default. Once a run has listened for these signals, tokio keeps
    /// its handlers installed for the rest of the process, so SIGINT and
    /// SIGTERM no longer terminate the host program by default. Only turn
    /// this on in a process that owns its signal handling, such as the
    /// `runcmd` binary.
    pub handle_signals: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            kill_grace: DEFAULT_KILL_GRACE,
            drain_grace: DEFAULT_DRAIN_GRACE,
            handle_signals: false,
        }
    }
}

/// Why supervision stopped.
#[derive(Debug)]
enum Outcome {
    Exited(i32),
    PumpFailed(String),
    TimedOut,
    Interrupted(&'static str),
    WaitFailed(std::io::Error),
}

impl Outcome {
    fn needs_kill(&self) -> bool {
        !matches!(self, Outcome::Exited(_))
    }
}

/// What a finished execution hands back.
struct Execution<W> {
    status: Status,
    sink: W,
    pid: u32,
}

/// Runs commands with a timeout, draining their combined output.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    config: RunnerConfig,
}

impl CommandRunner {
    /// Create a runner with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a runner with the given settings.
    pub fn with_config(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// The runner's settings.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run a command and capture its combined stdout and stderr in memory.
    ///
    /// The output is assumed to fit in memory; use
    /// [`CommandRunner::run_to_sink`] for large outputs. An empty spec
    /// succeeds immediately without spawning anything.
    pub async fn run(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        let start = Instant::now();
        let Some(cmd) = spec.to_command() else {
            debug!("no command supplied, nothing to run");
            return Ok(ExecutionResult::empty());
        };

        let execution = self.execute(spec, cmd, Vec::new()).await?;
        Ok(
            ExecutionResult::new(execution.status, execution.sink, start.elapsed())
                .with_pid(execution.pid),
        )
    }

    /// Run a command, streaming its combined stdout and stderr into `sink`.
    ///
    /// The sink must accept a zero-length write, otherwise
    /// [`RunError::InvalidInput`] is returned before anything is spawned.
    /// Only the pump writes to the sink.
    pub async fn run_to_sink<W>(&self, spec: &CommandSpec, sink: W) -> Result<Status>
    where
        W: Write + Send + 'static,
    {
        let Some(cmd) = spec.to_command() else {
            debug!("no command supplied, nothing to run");
            return Ok(Status::Completed(0));
        };

        self.execute(spec, cmd, sink)
            .await
            .map(|execution| execution.status)
    }

    async fn execute<W>(
        &self,
        spec: &CommandSpec,
        mut cmd: tokio::process::Command,
        sink: W,
    ) -> Result<Execution<W>>
    where
        W: Write + Send + 'static,
    {
        let command = spec.command_text();
        let start = Instant::now();

        let pump = OutputPump::new(sink).map_err(|e| match &e {
            PumpError::SinkUnwritable(_) => RunError::invalid_input(&command, e.to_string()),
            _ => RunError::internal(&command, e.to_string()),
        })?;

        if let Some(dir) = &spec.working_dir {
            if !dir.is_dir() {
                return Err(RunError::invalid_input(
                    &command,
                    format!("working directory {} does not exist", dir.display()),
                ));
            }
        }

        let (stdout, stderr) = pump.child_stdio().map_err(|e| {
            RunError::internal(&command, format!("failed to duplicate output pipe: {}", e))
        })?;
        cmd.stdout(stdout).stderr(stderr);

        let mut interrupts = self.interrupt_listener();

        let spawned = ChildProcess::spawn(&mut cmd);
        // Release the command's copies of the write end so EOF can arrive.
        drop(cmd);
        let mut child = spawned.map_err(|e| {
            warn!(command = %command, error = %e, "failed to spawn command");
            RunError::invalid_input(&command, format!("failed to spawn: {} ({:?})", e, e.kind()))
        })?;
        let pid = child.pid();
        info!(pid, command = %command, timeout = ?spec.timeout, "command started");

        let mut pump = pump.start();
        let deadline = spec.timeout.map(|timeout| start + timeout);
        let outcome = self
            .supervise(&mut child, &pump, deadline, &mut interrupts)
            .await;

        self.teardown(&mut child, &mut pump, &outcome).await;

        let pump_error = pump.error_message();
        let sink = pump.finish().await.map_err(|e| {
            error!(pid, error = %e, "output pump did not return the sink");
            RunError::internal(&command, e.to_string())
        })?;
        let elapsed = start.elapsed();

        let status = match outcome {
            Outcome::Exited(code) => Status::Completed(code),
            Outcome::TimedOut => {
                warn!(pid, ?elapsed, "command timed out, process group killed");
                Status::TimedOut
            }
            Outcome::PumpFailed(message) => {
                error!(pid, %message, "output pump failed, process group killed");
                return Err(RunError::internal(&command, message));
            }
            Outcome::WaitFailed(e) => {
                error!(pid, error = %e, "failed to poll child");
                return Err(RunError::internal(
                    &command,
                    format!("failed to poll child: {}", e),
                ));
            }
            Outcome::Interrupted(signal) => {
                warn!(pid, signal, "runner interrupted, process group killed");
                return Err(RunError::interrupted(
                    &command,
                    format!("received {}", signal),
                ));
            }
        };

        // A sink failure during the final drain still means lost output.
        if let Some(message) = pump_error {
            error!(pid, %message, "output pump failed during final drain");
            return Err(RunError::internal(&command, message));
        }

        info!(pid, %status, ?elapsed, "command finished");
        Ok(Execution { status, sink, pid })
    }

    /// Register for interrupts if this runner handles them.
    fn interrupt_listener(&self) -> Option<InterruptListener> {
        if !self.config.handle_signals {
            return None;
        }
        InterruptListener::new()
            .inspect_err(|e| warn!(error = %e, "cannot listen for interrupt signals"))
            .ok()
    }

    /// Poll until the child exits, the pump fails, the deadline passes or an
    /// interrupt arrives.
    ///
    /// Each iteration checks exit, then pump error, then deadline, so a child
    /// seen as exited wins a tie with its deadline.
    async fn supervise<W>(
        &self,
        child: &mut ChildProcess,
        pump: &RunningPump<W>,
        deadline: Option<Instant>,
        interrupts: &mut Option<InterruptListener>,
    ) -> Outcome {
        loop {
            match child.try_exit_code() {
                Ok(Some(code)) => return Outcome::Exited(code),
                Ok(None) => {}
                Err(e) => return Outcome::WaitFailed(e),
            }

            if let Some(message) = pump.error_message() {
                return Outcome::PumpFailed(message);
            }

            let now = Instant::now();
            let tick = match deadline {
                Some(deadline) if now >= deadline => return Outcome::TimedOut,
                Some(deadline) => self
                    .config
                    .poll_interval
                    .min(deadline.saturating_duration_since(now)),
                None => self.config.poll_interval,
            };

            tokio::select! {
                biased;
                // Exit is picked up by try_exit_code on the next iteration.
                _ = child.wait() => {}
                signal = next_interrupt(interrupts) => return Outcome::Interrupted(signal),
                _ = tokio::time::sleep(tick) => {}
            }
        }
    }

    /// Kill the group when the child may still be alive, then stop and join
    /// the pump. Every outcome goes through here.
    async fn teardown<W>(
        &self,
        child: &mut ChildProcess,
        pump: &mut RunningPump<W>,
        outcome: &Outcome,
    ) {
        let pid = child.pid();

        if outcome.needs_kill() {
            if let Err(e) = child.terminate_tree(self.config.kill_grace).await {
                warn!(pid, error = %e, "failed to terminate process tree");
            }
        }

        pump.stop();
        if pump.wait(Some(self.config.drain_grace)).await {
            return;
        }

        warn!(pid, "descendants still hold the output pipe, killing process group");
        if let Err(e) = child.terminate_tree(self.config.kill_grace).await {
            warn!(pid, error = %e, "failed to terminate process tree");
        }
        pump.wait(None).await;
    }
}

/// Run a shell command line with default settings and no timeout.
pub async fn run_simple(command_line: &str) -> Result<ExecutionResult> {
    let spec = CommandSpec::new(command_line).shell(true);
    CommandRunner::new().run(&spec).await
}

/// Run a shell command line with default settings and a timeout.
pub async fn run_with_timeout(command_line: &str, timeout: Duration) -> Result<ExecutionResult> {
    let spec = CommandSpec::new(command_line).shell(true).timeout(timeout);
    CommandRunner::new().run(&spec).await
}
