//! Request scheduler: admission front door and lifecycle.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::bucket::{TokenBucket, TokenBucketConfig};
use super::dedup::DedupCache;
use super::error::SchedulerError;
use super::priority::{LaneSet, Priority};
use super::queued_request::{QueuedRequest, WorkFn};
use super::stats::{SchedulerCounters, SchedulerMetrics};
use super::worker;
use crate::telemetry;

/// Configuration for the request lanes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestQueueConfig {
    /// Hard ceiling on queued requests across all lanes.
    pub max_pending: usize,
    /// Deadline applied to requests enqueued without an explicit timeout.
    pub default_timeout_ms: Option<u64>,
}

impl Default for RequestQueueConfig {
    fn default() -> Self {
        Self { max_pending: 1000, default_timeout_ms: None }
    }
}

impl RequestQueueConfig {
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}

/// Full scheduler configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub bucket: TokenBucketConfig,
    pub queue: RequestQueueConfig,
}

impl SchedulerConfig {
    /// Reject configurations under which nothing could ever be admitted.
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket.max_tokens == 0 {
            return Err("bucket.max_tokens must be greater than 0".into());
        }
        if self.bucket.refill_interval_ms == 0 {
            return Err("bucket.refill_interval_ms must be greater than 0".into());
        }
        if self.queue.max_pending == 0 {
            return Err("queue.max_pending must be greater than 0".into());
        }
        Ok(())
    }
}

/// Per-request admission options.
#[derive(Debug, Clone)]
pub struct EnqueueOptions {
    pub priority: Priority,
    pub weight: u64,
    pub dedupe_key: Option<String>,
    pub timeout: Option<Duration>,
}

impl EnqueueOptions {
    pub fn new(priority: Priority, weight: u64) -> Self {
        Self { priority, weight, dedupe_key: None, timeout: None }
    }

    /// Collapse concurrent requests sharing `key` into one execution.
    pub fn dedupe_key(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = Some(key.into());
        self
    }

    /// Give up if the request is still queued after `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

type SharedOutcome<T, E> = Shared<BoxFuture<'static, Result<T, SchedulerError<E>>>>;

/// Pending outcome of an enqueued request.
///
/// Cloneable; every clone resolves to the same outcome. Dropping it does
/// not cancel the request.
pub struct PendingResult<T, E> {
    id: u64,
    deduplicated: bool,
    inner: SharedOutcome<T, E>,
}

impl<T, E> PendingResult<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn new(id: u64, rx: oneshot::Receiver<Result<T, SchedulerError<E>>>) -> Self {
        let inner = rx
            .map(|received| received.unwrap_or(Err(SchedulerError::ShutDown)))
            .boxed()
            .shared();
        Self { id, deduplicated: false, inner }
    }
}

impl<T, E> PendingResult<T, E> {
    /// Id of the request that will produce this outcome.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True if this handle joined a request enqueued by someone else.
    pub fn is_deduplicated(&self) -> bool {
        self.deduplicated
    }
}

impl<T, E> Clone for PendingResult<T, E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            deduplicated: self.deduplicated,
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> fmt::Debug for PendingResult<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResult")
            .field("id", &self.id)
            .field("deduplicated", &self.deduplicated)
            .finish()
    }
}

impl<T, E> Future for PendingResult<T, E>
where
    T: Clone,
    E: Clone,
{
    type Output = Result<T, SchedulerError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

/// Lanes and dedup entries, mutated together under one lock.
pub(super) struct QueueState<T, E> {
    pub(super) lanes: LaneSet<QueuedRequest<T, E>>,
    pub(super) dedup: DedupCache<PendingResult<T, E>>,
    pub(super) closed: bool,
}

impl<T, E> QueueState<T, E> {
    /// Publish queue and dedup gauges. Call with the state lock held so
    /// successive readings land in mutation order.
    pub(super) fn publish_depth(&self) {
        telemetry::record_queue_depth(self.lanes.len());
        for priority in Priority::ALL {
            telemetry::record_lane_depth(priority, self.lanes.lane_len(priority));
        }
        telemetry::record_dedup_entries(self.dedup.len());
    }
}

/// State shared between the handle, the admission loop and the refill timer.
pub(super) struct SchedulerCore<T, E> {
    pub(super) config: SchedulerConfig,
    pub(super) state: Mutex<QueueState<T, E>>,
    pub(super) bucket: Mutex<TokenBucket>,
    pub(super) counters: SchedulerCounters,
    /// Signalled on enqueue and refill.
    pub(super) wake: Notify,
    next_id: AtomicU64,
}

impl<T, E> SchedulerCore<T, E> {
    /// Drop a dedup entry if `id` still owns it. Must run before delivery.
    pub(super) fn release_dedupe_key(&self, key: Option<&str>, id: u64) {
        if let Some(key) = key {
            let mut state = self.state.lock();
            if state.dedup.remove(key, id) {
                telemetry::record_dedup_entries(state.dedup.len());
            }
        }
    }
}

/// Weighted, prioritized, deduplicating admission scheduler.
///
/// Construct inside a tokio runtime; `new` spawns the refill timer and the
/// admission loop. Work is executed one request at a time.
pub struct RequestScheduler<T, E> {
    core: Arc<SchedulerCore<T, E>>,
    shutdown: CancellationToken,
}

impl<T, E> RequestScheduler<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + fmt::Display + 'static,
{
    pub fn new(config: SchedulerConfig) -> Self {
        let bucket = TokenBucket::new(&config.bucket);
        let core = Arc::new(SchedulerCore {
            config,
            state: Mutex::new(QueueState {
                lanes: LaneSet::new(),
                dedup: DedupCache::new(),
                closed: false,
            }),
            bucket: Mutex::new(bucket),
            counters: SchedulerCounters::default(),
            wake: Notify::new(),
            next_id: AtomicU64::new(1),
        });
        let shutdown = CancellationToken::new();

        worker::spawn_refill_timer(core.clone(), shutdown.clone());
        worker::spawn_admission_loop(core.clone(), shutdown.clone());

        tracing::debug!(
            max_tokens = core.config.bucket.max_tokens,
            refill_rate = core.config.bucket.refill_rate,
            refill_interval_ms = core.config.bucket.refill_interval_ms,
            max_pending = core.config.queue.max_pending,
            "scheduler started"
        );
        Self { core, shutdown }
    }

    /// Submit work for admission.
    ///
    /// Returns the shared outcome of an in-flight request when `dedupe_key`
    /// matches one, otherwise queues a new request. Fails synchronously
    /// when the queue is full, the weight is zero or the scheduler is gone.
    pub fn enqueue<F, Fut>(
        &self,
        work: F,
        options: EnqueueOptions,
    ) -> Result<PendingResult<T, E>, SchedulerError<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let EnqueueOptions { priority, weight, dedupe_key, timeout } = options;
        if weight == 0 {
            return Err(SchedulerError::InvalidWeight);
        }

        let mut state = self.core.state.lock();
        if state.closed {
            return Err(SchedulerError::ShutDown);
        }

        if let Some(key) = dedupe_key.as_deref() {
            if let Some(existing) = state.dedup.get(key) {
                drop(state);
                self.core.counters.record_deduplicated();
                telemetry::record_dedup_hit();
                tracing::debug!(request_id = existing.id, dedupe_key = key, "joined in-flight request");
                return Ok(PendingResult { deduplicated: true, ..existing });
            }
        }

        let max_pending = self.core.config.queue.max_pending;
        let queued = state.lanes.len();
        if queued >= max_pending {
            drop(state);
            self.core.counters.record_dropped();
            telemetry::record_dropped(priority);
            tracing::warn!(queued, max_pending, %priority, weight, "request queue full, dropping request");
            return Err(SchedulerError::QueueFull { max_pending });
        }

        let max_tokens = self.core.config.bucket.max_tokens;
        if weight > max_tokens {
            tracing::warn!(weight, max_tokens, "request weight exceeds bucket capacity and can never be admitted");
        }

        let id = self.core.next_id.fetch_add(1, Ordering::SeqCst);
        let enqueued_at = Instant::now();
        // A deadline past the clock's range is no deadline.
        let deadline = timeout
            .or_else(|| self.core.config.queue.default_timeout())
            .and_then(|t| enqueued_at.checked_add(t));
        let (response_tx, rx) = oneshot::channel();
        let pending = PendingResult::new(id, rx);
        if let Some(key) = &dedupe_key {
            state.dedup.insert(key.clone(), id, pending.clone());
        }

        let work: WorkFn<T, E> = Box::new(move || work().boxed());
        state.lanes.push_back(
            QueuedRequest {
                id,
                priority,
                weight,
                work,
                enqueued_at,
                deadline,
                dedupe_key,
                response_tx,
            },
            priority,
        );
        state.publish_depth();
        drop(state);

        telemetry::record_enqueued(priority);
        self.core.wake.notify_one();
        Ok(pending)
    }

    /// Read-only snapshot of tokens, queue size and counters.
    pub fn metrics(&self) -> SchedulerMetrics {
        let queue_size = self.core.state.lock().lanes.len();
        let available = self.core.bucket.lock().available();
        self.core.counters.snapshot(available, queue_size)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.core.config
    }
}

impl<T, E> RequestScheduler<T, E> {
    /// Stop the refill timer and admission loop, and fail everything still
    /// queued with `ShutDown`. Work already executing runs to completion.
    /// Calling it again does nothing.
    pub fn destroy(&self) {
        let abandoned = {
            let mut state = self.core.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.dedup.clear();
            let abandoned = state.lanes.drain();
            state.publish_depth();
            abandoned
        };
        self.shutdown.cancel();

        let count = abandoned.len();
        for request in abandoned {
            request.settle(Err(SchedulerError::ShutDown));
        }
        tracing::info!(abandoned = count, "scheduler destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.core.state.lock().closed
    }
}

impl<T, E> Drop for RequestScheduler<T, E> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
