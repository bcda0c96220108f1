//! External interrupts delivered to the runner's own process.

use std::io;

/// Listens for the signals that should abort a running command.
///
/// Registration happens in [`InterruptListener::new`], so a signal arriving
/// any time after construction is observed.
pub(crate) struct InterruptListener {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl InterruptListener {
    #[cfg(unix)]
    pub fn new() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(windows)]
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    /// Wait for the next interrupt and return the signal's name.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            Some(()) = self.interrupt.recv() => "SIGINT",
            Some(()) = self.terminate.recv() => "SIGTERM",
            else => std::future::pending().await,
        }
    }

    #[cfg(windows)]
    pub async fn recv(&mut self) -> &'static str {
        match self.ctrl_c.recv().await {
            Some(()) => "CTRL_C",
            None => std::future::pending().await,
        }
    }
}

/// Resolve on the next interrupt; never resolves without a listener.
pub(crate) async fn next_interrupt(listener: &mut Option<InterruptListener>) -> &'static str {
    match listener {
        Some(listener) => listener.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_without_listener_never_resolves() {
        let mut listener = None;
        let result =
            tokio::time::timeout(Duration::from_millis(50), next_interrupt(&mut listener)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_listener_idle_without_signal() {
        let mut listener = Some(InterruptListener::new().unwrap());
        let result =
            tokio::time::timeout(Duration::from_millis(50), next_interrupt(&mut listener)).await;
        assert!(result.is_err());
    }
}
