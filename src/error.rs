//! Error types for runcmd.

use thiserror::Error;

use crate::execution::Status;

/// Main error type for command execution.
///
/// Every variant carries the text of the command that was being run so a
/// caller juggling several invocations can tell which one failed. Timeouts
/// are not errors: they are reported as [`Status::TimedOut`].
#[derive(Error, Debug)]
pub enum RunError {
    /// The sink was unusable, or the command could not be spawned.
    #[error("invalid input for command `{command}`: {message}")]
    InvalidInput { command: String, message: String },

    /// The output pump failed mid-run, or the child could not be supervised.
    #[error("internal error while running `{command}`: {message}")]
    Internal { command: String, message: String },

    /// An external signal reached the runner while the command was running.
    #[error("command `{command}` was interrupted: {message}")]
    Interrupted { command: String, message: String },
}

impl RunError {
    pub(crate) fn invalid_input(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            command: command.into(),
            message: message.into(),
        }
    }

    pub(crate) fn internal(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Internal {
            command: command.into(),
            message: message.into(),
        }
    }

    pub(crate) fn interrupted(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Interrupted {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Terminal status this error corresponds to.
    pub fn status(&self) -> Status {
        match self {
            Self::InvalidInput { .. } => Status::InvalidInput,
            Self::Internal { .. } => Status::Internal,
            Self::Interrupted { .. } => Status::Interrupted,
        }
    }

    /// The command text that was being run.
    pub fn command(&self) -> &str {
        match self {
            Self::InvalidInput { command, .. }
            | Self::Internal { command, .. }
            | Self::Interrupted { command, .. } => command,
        }
    }

    /// The diagnostic message without the command prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput { message, .. }
            | Self::Internal { message, .. }
            | Self::Interrupted { message, .. } => message,
        }
    }
}

/// Convenience Result type for runcmd operations.
pub type Result<T> = std::result::Result<T, RunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_display() {
        let err = RunError::invalid_input("echo hello", "No such file or directory");
        assert!(err.to_string().contains("invalid input"));
        assert!(err.to_string().contains("echo hello"));
        assert!(err.to_string().contains("No such file"));
    }

    #[test]
    fn test_internal_display() {
        let err = RunError::internal("yes", "sink write failed: broken pipe");
        assert!(err.to_string().contains("internal error"));
        assert!(err.to_string().contains("broken pipe"));
    }

    #[test]
    fn test_interrupted_display() {
        let err = RunError::interrupted("sleep 30", "received SIGTERM");
        assert!(err.to_string().contains("interrupted"));
        assert!(err.to_string().contains("SIGTERM"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(RunError::invalid_input("x", "y").status(), Status::InvalidInput);
        assert_eq!(RunError::internal("x", "y").status(), Status::Internal);
        assert_eq!(RunError::interrupted("x", "y").status(), Status::Interrupted);
        assert_eq!(RunError::interrupted("x", "y").status().code(), -3);
    }

    #[test]
    fn test_accessors() {
        let err = RunError::internal("ls -la", "boom");
        assert_eq!(err.command(), "ls -la");
        assert_eq!(err.message(), "boom");
    }
}
