//! Flags shared between a pump worker and its owner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

/// Stop, finished and error flags of one pump.
#[derive(Debug, Default)]
pub(super) struct PumpState {
    stop: AtomicBool,
    finished: AtomicBool,
    error: OnceLock<String>,
}

impl PumpState {
    /// Request the worker to stop after a final drain pass.
    ///
    /// Returns `true` on the first call only.
    pub fn request_stop(&self) -> bool {
        !self.stop.swap(true, Ordering::AcqRel)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Record a failure. Only the first message is kept.
    pub fn fail(&self, message: String) {
        let _ = self.error.set(message);
    }

    pub fn error(&self) -> Option<&str> {
        self.error.get().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_is_idempotent() {
        let state = PumpState::default();
        assert!(!state.stop_requested());
        assert!(state.request_stop());
        assert!(!state.request_stop());
        assert!(state.stop_requested());
    }

    #[test]
    fn test_first_error_wins() {
        let state = PumpState::default();
        assert!(state.error().is_none());
        state.fail("first".into());
        state.fail("second".into());
        assert_eq!(state.error(), Some("first"));
    }

    #[test]
    fn test_finished_flag() {
        let state = PumpState::default();
        assert!(!state.is_finished());
        state.mark_finished();
        assert!(state.is_finished());
    }
}
