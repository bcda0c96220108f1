//! Child process handle and process-tree termination.
//!
//! Every child is spawned as the leader of its own process group, so its pid
//! doubles as the group id. [`ChildProcess::terminate_tree`] signals the whole
//! group and reaps the leader; the platform split lives in [`killer`].

mod killer;

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// A spawned child and its process group id.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    pid: u32,
    exit_code: Option<i32>,
}

impl ChildProcess {
    /// Spawn `cmd`.
    ///
    /// The command is expected to already place the child in a new process
    /// group.
    pub fn spawn(cmd: &mut Command) -> io::Result<Self> {
        let child = cmd.spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| io::Error::other("spawned child has no pid"))?;
        debug!(pid, "child spawned");
        Ok(Self {
            child,
            pid,
            exit_code: None,
        })
    }

    /// Process id of the child; also its process group id.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit code if the child has been observed to exit.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Check whether the child has exited, without blocking.
    pub fn try_exit_code(&mut self) -> io::Result<Option<i32>> {
        if self.exit_code.is_some() {
            return Ok(self.exit_code);
        }
        Ok(self.child.try_wait()?.map(|status| self.record(status)))
    }

    /// Wait for the child to exit. Cancel safe.
    pub async fn wait(&mut self) -> io::Result<i32> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }
        let status = self.child.wait().await?;
        Ok(self.record(status))
    }

    /// Terminate the child's whole process group and reap the child.
    ///
    /// Idempotent: terminating a group that is already gone is a no-op.
    pub async fn terminate_tree(&mut self, grace: Duration) -> io::Result<()> {
        debug!(pid = self.pid, ?grace, "terminating process tree");
        killer::terminate_group(self.pid)?;

        if tokio::time::timeout(grace, self.wait()).await.is_err() {
            warn!(pid = self.pid, ?grace, "process group ignored termination, killing");
        }

        // Sweep descendants that outlived the leader.
        killer::kill_group(self.pid)?;

        if self.exit_code.is_none() {
            if let Err(e) = self.child.start_kill() {
                debug!(pid = self.pid, error = %e, "direct kill failed");
            }
        }
        self.wait().await?;
        Ok(())
    }

    fn record(&mut self, status: ExitStatus) -> i32 {
        let code = exit_code(status);
        debug!(pid = self.pid, code, "child exited");
        self.exit_code = Some(code);
        code
    }
}

/// Exit code of a finished process.
///
/// A process killed by signal `N` reports `128 + N`, the shell convention, so
/// real exit codes are never negative.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
