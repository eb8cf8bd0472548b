//! Request scheduling module for rate-gate.
//!
//! Meters weighted requests against a token bucket, orders them across
//! three strict-priority FIFO lanes, collapses duplicate in-flight requests
//! and rejects work once the queue ceiling is reached.

mod bucket;
mod dedup;
mod error;
mod priority;
mod queue;
mod queued_request;
mod stats;
mod worker;

pub use bucket::{TokenBucket, TokenBucketConfig};
pub use dedup::DedupCache;
pub use error::SchedulerError;
pub use priority::{LaneSet, Priority};
pub use queue::{
    EnqueueOptions, PendingResult, RequestQueueConfig, RequestScheduler, SchedulerConfig,
};
pub use queued_request::{WorkFn, WorkFuture};
pub use stats::SchedulerMetrics;
