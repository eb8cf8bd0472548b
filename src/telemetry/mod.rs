//! Telemetry module for rate-gate.
//!
//! Provides structured logging, request spans, and metrics facade emission.

mod logging;
mod metrics;
mod spans;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use metrics::{
    record_admitted, record_available_tokens, record_completed, record_dedup_entries,
    record_dedup_hit, record_dropped, record_enqueued, record_expired, record_lane_depth,
    record_queue_depth,
};
pub use spans::{RequestSpan, SpanExt};
