//! Configuration management for runcmd.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::execution::RunnerConfig;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Runner configuration.
    pub runner: RunnerSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Runner configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    /// Interval between supervision checks, in milliseconds.
    pub poll_interval_ms: u64,
    /// Time between SIGTERM and SIGKILL, in milliseconds.
    pub kill_grace_ms: u64,
    /// Time allowed to drain output once the child is gone, in milliseconds.
    pub drain_grace_ms: u64,
    /// Abort the command when this process receives SIGINT or SIGTERM.
    ///
    /// Defaults to on here, unlike [`RunnerConfig::default`].
    pub handle_signals: bool,
}

impl Default for RunnerSection {
    fn default() -> Self {
        let defaults = RunnerConfig::default();
        Self {
            poll_interval_ms: defaults.poll_interval.as_millis() as u64,
            kill_grace_ms: defaults.kill_grace.as_millis() as u64,
            drain_grace_ms: defaults.drain_grace.as_millis() as u64,
            // Only the binary listens for signals.
            handle_signals: true,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source (for testing).
    pub fn apply_env_from<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let millis = |key: &str| var(key).and_then(|v| v.parse::<u64>().ok());

        if let Some(ms) = millis("RUNCMD_POLL_INTERVAL_MS") {
            self.runner.poll_interval_ms = ms;
        }
        if let Some(ms) = millis("RUNCMD_KILL_GRACE_MS") {
            self.runner.kill_grace_ms = ms;
        }
        if let Some(ms) = millis("RUNCMD_DRAIN_GRACE_MS") {
            self.runner.drain_grace_ms = ms;
        }

        if let Some(level) = var("RUNCMD_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ms) = args.poll_interval_ms {
            self.runner.poll_interval_ms = ms;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Config::default();

        // Load from config file if specified
        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        // Apply environment variable overrides
        config.apply_env();

        // Apply CLI argument overrides (highest priority)
        config.apply_args(args);

        Ok(config)
    }

    /// Convert to the runner's settings.
    pub fn runner_config(&self) -> Result<RunnerConfig, ConfigError> {
        if self.runner.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "poll_interval_ms",
                "must be greater than zero".into(),
            ));
        }

        Ok(RunnerConfig {
            poll_interval: Duration::from_millis(self.runner.poll_interval_ms),
            kill_grace: Duration::from_millis(self.runner.kill_grace_ms),
            drain_grace: Duration::from_millis(self.runner.drain_grace_ms),
            handle_signals: self.runner.handle_signals,
        })
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// A setting is out of range.
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidValue(name, reason) => write!(f, "invalid {}: {}", name, reason),
        }
    }
}

impl std::error::Error for ConfigError {}
