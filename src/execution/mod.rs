//! Command execution engine.
//!
//! This module provides bounded-time command execution:
//! - Combined stdout/stderr drained concurrently into a sink
//! - Wall-clock timeout with process-group termination
//! - Interrupt handling with the same teardown as every other exit path
//!
//! # Example
//!
//! ```no_run
//! use runcmd::execution::{CommandRunner, CommandSpec, Status};
//!
//! # async fn demo() -> runcmd::Result<()> {
//! let runner = CommandRunner::new();
//! let spec = CommandSpec::new("echo hello").shell(true).timeout_secs(5);
//! let result = runner.run(&spec).await?;
//! assert_eq!(result.status, Status::Completed(0));
//! println!("Output: {}", result.text());
//! # Ok(())
//! # }
//! ```

mod command;
mod interrupt;
mod result;
mod runner;

pub use command::{CommandSpec, Program};
pub use result::{
    ExecutionResult, Status, INTERNAL_ERR, INTERRUPT_ERR, INVALID_INPUT_ERR, TIMEOUT_ERR,
};
pub use runner::{
    run_simple, run_with_timeout, CommandRunner, RunnerConfig, DEFAULT_DRAIN_GRACE,
    DEFAULT_KILL_GRACE, DEFAULT_POLL_INTERVAL,
};
