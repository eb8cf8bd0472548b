//! Scheduler error types.

use thiserror::Error;

/// Outcome error for a scheduled request.
///
/// `E` is the error type produced by the caller's work. It is passed
/// through untouched in `Work`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError<E> {
    #[error("request queue is full ({max_pending} pending)")]
    QueueFull { max_pending: usize },

    #[error("request weight must be positive")]
    InvalidWeight,

    #[error("request deadline elapsed after {waited_ms}ms in queue")]
    DeadlineExceeded { waited_ms: u64 },

    #[error("scheduler shut down before the request ran")]
    ShutDown,

    #[error("request work panicked")]
    WorkPanicked,

    #[error("{0}")]
    Work(E),
}

impl<E> SchedulerError<E> {
    /// True when the error was raised synchronously by `enqueue`.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::QueueFull { .. } | Self::InvalidWeight)
    }

    /// The work's own error, if that is what this is.
    pub fn work_error(&self) -> Option<&E> {
        match self {
            Self::Work(e) => Some(e),
            _ => None,
        }
    }
}
