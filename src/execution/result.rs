//! Execution status and result types.

use std::fmt;
use std::time::Duration;

/// Sentinel reported when the output pump failed.
pub const INTERNAL_ERR: i32 = -1;
/// Sentinel reported when the command ran past its timeout and was killed.
pub const TIMEOUT_ERR: i32 = -2;
/// Sentinel reported when the runner was interrupted by a signal.
pub const INTERRUPT_ERR: i32 = -3;
/// Sentinel reported for invalid parameters or a failed spawn.
pub const INVALID_INPUT_ERR: i32 = -4;

/// Terminal status of one execution.
///
/// Exactly one status is assigned per run. `Completed` carries the child's
/// real exit code, which is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The child exited on its own.
    Completed(i32),
    /// The timeout elapsed and the process group was killed.
    TimedOut,
    /// The output pump failed and the process group was killed.
    Internal,
    /// An external signal interrupted the runner.
    Interrupted,
    /// The command never started.
    InvalidInput,
}

impl Status {
    /// Numeric form of the status, stable across embeddings.
    pub fn code(&self) -> i32 {
        match self {
            Status::Completed(code) => *code,
            Status::TimedOut => TIMEOUT_ERR,
            Status::Internal => INTERNAL_ERR,
            Status::Interrupted => INTERRUPT_ERR,
            Status::InvalidInput => INVALID_INPUT_ERR,
        }
    }

    /// Inverse of [`Status::code`].
    pub fn from_code(code: i32) -> Self {
        match code {
            TIMEOUT_ERR => Status::TimedOut,
            INTERRUPT_ERR => Status::Interrupted,
            INVALID_INPUT_ERR => Status::InvalidInput,
            c if c < 0 => Status::Internal,
            c => Status::Completed(c),
        }
    }

    /// Check if the child exited with code 0.
    pub fn success(&self) -> bool {
        matches!(self, Status::Completed(0))
    }

    /// Check if the child ran to completion, whatever its exit code.
    pub fn is_completed(&self) -> bool {
        matches!(self, Status::Completed(_))
    }

    /// Check if the run was cut short by the timeout.
    pub fn timed_out(&self) -> bool {
        matches!(self, Status::TimedOut)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Completed(code) => write!(f, "completed (exit code {})", code),
            Status::TimedOut => write!(f, "timed out"),
            Status::Internal => write!(f, "internal error"),
            Status::Interrupted => write!(f, "interrupted"),
            Status::InvalidInput => write!(f, "invalid input"),
        }
    }
}

/// Result of a buffered command execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Terminal status.
    pub status: Status,
    /// Combined stdout and stderr of the child, in the order it was written.
    pub output: Vec<u8>,
    /// Wall-clock time spent in the runner.
    pub duration: Duration,
    /// Process id (and process group id) of the child, if one was spawned.
    pub pid: Option<u32>,
}

impl ExecutionResult {
    /// Create a new execution result.
    pub fn new(status: Status, output: Vec<u8>, duration: Duration) -> Self {
        Self {
            status,
            output,
            duration,
            pid: None,
        }
    }

    /// Result of a run that had nothing to execute.
    pub fn empty() -> Self {
        Self::new(Status::Completed(0), Vec::new(), Duration::ZERO)
    }

    /// Set the child pid.
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Status as the numeric sentinel.
    pub fn code(&self) -> i32 {
        self.status.code()
    }

    /// Check if command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Check if command failed (non-zero exit code or timeout).
    pub fn failed(&self) -> bool {
        !self.status.success()
    }

    /// Output decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Default for ExecutionResult {
    fn default() -> Self {
        Self::empty()
    }
}
