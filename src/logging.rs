//! Logging initialization and configuration.
//!
//! Logs go to stderr so that a command's captured output on stdout stays
//! clean.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor a level is given.
pub const DEFAULT_FILTER: &str = "runcmd=info";

/// Initialize the logging system.
///
/// Uses the `RUST_LOG` environment variable for filtering. If not set,
/// defaults to `runcmd=info`.
///
/// # Panics
///
/// Panics if called more than once, or if another tracing subscriber
/// has already been set.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Try to initialize the logging system.
///
/// Returns `Ok(())` if successful, or `Err` if logging has already been
/// initialized.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    try_init_with(filter)
}

/// Initialize logging with an explicit filter such as `debug` or
/// `runcmd=trace`.
///
/// A bare level applies to this crate only. Falls back to the default filter
/// if the directive does not parse.
pub fn try_init_with_filter(directive: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    try_init_with(filter_for(directive))
}

fn filter_for(directive: &str) -> EnvFilter {
    let directive = match directive {
        "error" | "warn" | "info" | "debug" | "trace" | "off" => format!("runcmd={}", directive),
        other => other.to_string(),
    };
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn try_init_with(filter: EnvFilter) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init()
}
