//! Span utilities and extension traits for scheduler tracing.
//!
//! Provides standardized span creation and result recording.

use tracing::{info_span, Span};

use crate::scheduler::Priority;

/// Extension trait for adding context to spans.
pub trait SpanExt {
    /// Record the result of an operation into the span.
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.message", e.to_string().as_str());
            }
        }
    }
}

/// Factory for creating standardized request spans.
pub struct RequestSpan;

impl RequestSpan {
    /// Create a new span for an admitted request.
    ///
    /// Fields included:
    /// - `request_id`: scheduler-assigned id
    /// - `priority`: lane the request came from
    /// - `weight`: tokens debited for it
    /// - `wait_ms`: time spent queued, filled in at admission
    /// - `status` / `error.message`: filled in by `SpanExt::record_result`
    /// - `latency_ms`: filled in after the work completes
    pub fn new(request_id: u64, priority: Priority, weight: u64) -> Span {
        info_span!(
            "scheduled_request",
            request_id,
            priority = priority.as_str(),
            weight,
            wait_ms = tracing::field::Empty,
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_result_accepts_both_outcomes() {
        let span = RequestSpan::new(7, Priority::High, 20);
        span.record_result::<(), String>(&Ok(()));
        span.record_result::<(), String>(&Err("upstream 429".into()));
        span.record("latency_ms", 12u64);
    }
}
