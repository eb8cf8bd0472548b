//! rate-gate
//!
//! Admission control for calls to a rate-limited remote API. Every call is
//! metered against a replenishing token budget and ordered by priority.
//!
//! # Pieces
//!
//! - **Token bucket**: capacity refilled on a fixed timer; each request
//!   debits its weight.
//! - **Priority lanes**: HIGH, MEDIUM, LOW, strictly ordered, FIFO inside a
//!   lane. A head request that cannot be paid for blocks its lane.
//! - **Dedup**: concurrent requests sharing a key run once and share the
//!   outcome.
//! - **Backpressure**: `enqueue` fails fast once the queue ceiling is hit.
//!
//! ```no_run
//! use rate_gate::{EnqueueOptions, Priority, RequestScheduler, SchedulerConfig};
//!
//! # async fn demo() {
//! let scheduler: RequestScheduler<String, String> =
//!     RequestScheduler::new(SchedulerConfig::default());
//! let pending = scheduler
//!     .enqueue(
//!         || async { Ok::<_, String>("mids".to_string()) },
//!         EnqueueOptions::new(Priority::Medium, 2).dedupe_key("allMids"),
//!     )
//!     .expect("queue has room");
//! let _mids = pending.await;
//! scheduler.destroy();
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod scheduler;
pub mod telemetry;

pub use scheduler::{
    EnqueueOptions, PendingResult, Priority, RequestScheduler, SchedulerConfig, SchedulerError,
    SchedulerMetrics,
};
