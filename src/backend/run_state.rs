//! Worker run flag and cancellation token
//!
//! ```text
//! Stopped(0) ──start──> Running(1) ──finish──> FinishedUnconsumed(2) ──consume──> FinishedConsumed(3)
//!     ^                     │
//!     └───────stop──────────┘   (stop may be forced from any state)
//! ```
//!
//! The flag is the only cancellation mechanism: the worker's engine polls it
//! through a [`CancelToken`] and the cap guard forces it to `Stopped`.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Worker run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    /// No worker, or cancellation requested
    Stopped = 0,
    /// A worker is executing passes
    Running = 1,
    /// The worker exited on its own and nobody has looked yet
    FinishedUnconsumed = 2,
    /// The exit was observed by the manager
    FinishedConsumed = 3,
}

impl From<u8> for RunState {
    fn from(v: u8) -> Self {
        match v {
            1 => RunState::Running,
            2 => RunState::FinishedUnconsumed,
            3 => RunState::FinishedConsumed,
            _ => RunState::Stopped,
        }
    }
}

/// Shared run flag
#[derive(Debug, Clone, Default)]
pub struct RunFlag(Arc<AtomicU8>);

impl RunFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(RunState::Stopped as u8)))
    }

    #[inline]
    pub fn state(&self) -> RunState {
        RunState::from(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    /// Mark a freshly spawned worker as running
    pub fn start(&self) {
        self.0.store(RunState::Running as u8, Ordering::Release);
    }

    /// Request cancellation
    pub fn stop(&self) {
        self.0.store(RunState::Stopped as u8, Ordering::Release);
    }

    /// Record a natural worker exit.
    ///
    /// Only a running flag moves to `FinishedUnconsumed`; a flag that was
    /// stopped (cancelled, or stopped by the cap guard) stays stopped.
    pub fn finish(&self) -> bool {
        self.transition(RunState::Running, RunState::FinishedUnconsumed)
    }

    /// Observe a finished worker; returns true exactly once per exit
    pub fn consume(&self) -> bool {
        self.transition(RunState::FinishedUnconsumed, RunState::FinishedConsumed)
    }

    fn transition(&self, from: RunState, to: RunState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Cancellation token handed to the expression engine
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: RunFlag,
}

impl CancelToken {
    pub fn new(flag: RunFlag) -> Self {
        Self { flag }
    }

    /// True once the run flag left `Running`
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        !self.flag.is_running()
    }

    /// A token that is never cancelled while its private flag runs
    pub fn detached() -> Self {
        let flag = RunFlag::new();
        flag.start();
        Self { flag }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8() {
        assert_eq!(RunState::from(0), RunState::Stopped);
        assert_eq!(RunState::from(1), RunState::Running);
        assert_eq!(RunState::from(2), RunState::FinishedUnconsumed);
        assert_eq!(RunState::from(3), RunState::FinishedConsumed);
        assert_eq!(RunState::from(200), RunState::Stopped);
    }

    #[test]
    fn test_natural_lifecycle() {
        let flag = RunFlag::new();
        assert_eq!(flag.state(), RunState::Stopped);

        flag.start();
        assert!(flag.is_running());

        assert!(flag.finish());
        assert_eq!(flag.state(), RunState::FinishedUnconsumed);

        assert!(flag.consume());
        assert_eq!(flag.state(), RunState::FinishedConsumed);
        assert!(!flag.consume(), "consume is one-shot");
    }

    #[test]
    fn test_finish_after_stop_stays_stopped() {
        let flag = RunFlag::new();
        flag.start();
        flag.stop();
        assert!(!flag.finish());
        assert_eq!(flag.state(), RunState::Stopped);
    }

    #[test]
    fn test_cancel_token_follows_flag() {
        let flag = RunFlag::new();
        let token = CancelToken::new(flag.clone());
        assert!(token.is_cancelled());

        flag.start();
        assert!(!token.is_cancelled());

        flag.stop();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_detached_token() {
        assert!(!CancelToken::detached().is_cancelled());
    }
}
