//! # runcmd
//!
//! Run commands with a timeout.
//!
//! A child process is launched in its own process group, its combined
//! stdout and stderr are drained through an OS pipe into a sink on a
//! separate worker, and a supervising loop enforces a wall-clock timeout.
//! Whenever a run ends abnormally (timeout, sink failure, interrupt) the
//! entire process tree is terminated and the output pipe is drained before
//! the runner returns.
//!
//! ## Status codes
//!
//! | Value | Meaning |
//! |---|---|
//! | `>= 0` | the child's exit code |
//! | `-1` | internal error (output lost, child not supervisable) |
//! | `-2` | timed out |
//! | `-3` | interrupted |
//! | `-4` | invalid input |
//!
//! ## Quick Start
//!
//! ```no_run
//! use runcmd::{CommandRunner, CommandSpec, Status};
//!
//! #[tokio::main]
//! async fn main() -> runcmd::Result<()> {
//!     // Initialize logging
//!     runcmd::logging::try_init().ok();
//!
//!     let runner = CommandRunner::new();
//!
//!     // Buffered: output is returned with the status
//!     let spec = CommandSpec::new("echo hello").shell(true);
//!     let result = runner.run(&spec).await?;
//!     assert_eq!(result.status, Status::Completed(0));
//!
//!     // Streaming: output goes straight into a file
//!     let file = std::fs::File::create("out.log").expect("create log file");
//!     let spec = CommandSpec::new("sleep 10").shell(true).timeout_secs(1);
//!     let status = runner.run_to_sink(&spec, file).await?;
//!     assert_eq!(status, Status::TimedOut);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod logging;
pub mod process;
pub mod pump;

// Re-export commonly used types
pub use error::{Result, RunError};
pub use execution::{CommandRunner, CommandSpec, ExecutionResult, Program, RunnerConfig, Status};
pub use pump::{OutputPump, RunningPump};
