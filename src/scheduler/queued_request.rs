//! Queued request type for the admission lanes.

use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::time::Instant;

use super::error::SchedulerError;
use super::priority::Priority;

/// Boxed future returned by a request's work.
pub type WorkFuture<T, E> = BoxFuture<'static, Result<T, E>>;

/// Deferred work: only invoked once the request is admitted.
pub type WorkFn<T, E> = Box<dyn FnOnce() -> WorkFuture<T, E> + Send>;

/// Response channel for delivering the outcome back to callers.
pub type ResponseTx<T, E> = oneshot::Sender<Result<T, SchedulerError<E>>>;

/// A request waiting in its priority lane.
pub struct QueuedRequest<T, E> {
    pub id: u64,
    pub priority: Priority,
    pub weight: u64,
    pub work: WorkFn<T, E>,
    pub enqueued_at: Instant,
    pub deadline: Option<Instant>,
    pub dedupe_key: Option<String>,
    pub response_tx: ResponseTx<T, E>,
}

impl<T, E> std::fmt::Debug for QueuedRequest<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedRequest")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("weight", &self.weight)
            .field("dedupe_key", &self.dedupe_key)
            .finish()
    }
}

impl<T, E> QueuedRequest<T, E> {
    /// Check if request has passed its deadline at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.map_or(false, |d| now >= d)
    }

    /// Time spent queued so far.
    pub fn waited_ms(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.enqueued_at).as_millis() as u64
    }

    /// Deliver the outcome. The caller may have gone away; that is fine.
    pub fn settle(self, result: Result<T, SchedulerError<E>>) {
        let _ = self.response_tx.send(result);
    }
}
