//! Scheduler counters and the read-only metrics snapshot.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time view of the scheduler. Reading it has no side effects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerMetrics {
    pub available_tokens: u64,
    pub queue_size: usize,
    /// Requests rejected because the queue was full.
    pub dropped_requests: u64,
    /// Requests whose work ran to completion, successfully or not.
    pub processed_requests: u64,
    pub failed_requests: u64,
    pub expired_requests: u64,
    /// Enqueue calls that joined an in-flight request.
    pub deduplicated_requests: u64,
    pub in_flight: usize,
}

/// Lock-free counters updated by `enqueue` and the admission loop.
#[derive(Debug, Default)]
pub(crate) struct SchedulerCounters {
    dropped: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    expired: AtomicU64,
    deduplicated: AtomicU64,
    in_flight: AtomicUsize,
}

impl SchedulerCounters {
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deduplicated(&self) {
        self.deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn begin_execution(&self) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
    }

    pub fn finish_execution(&self, success: bool) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    /// Fill the counter fields of a snapshot.
    pub fn snapshot(&self, available_tokens: u64, queue_size: usize) -> SchedulerMetrics {
        SchedulerMetrics {
            available_tokens,
            queue_size,
            dropped_requests: self.dropped.load(Ordering::Relaxed),
            processed_requests: self.processed.load(Ordering::Relaxed),
            failed_requests: self.failed.load(Ordering::Relaxed),
            expired_requests: self.expired.load(Ordering::Relaxed),
            deduplicated_requests: self.deduplicated.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Acquire),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_updates_processed_and_failed() {
        let counters = SchedulerCounters::default();
        counters.begin_execution();
        assert_eq!(counters.snapshot(0, 0).in_flight, 1);

        counters.finish_execution(false);
        counters.begin_execution();
        counters.finish_execution(true);

        let m = counters.snapshot(5, 2);
        assert_eq!(m.processed_requests, 2);
        assert_eq!(m.failed_requests, 1);
        assert_eq!(m.in_flight, 0);
        assert_eq!(m.available_tokens, 5);
        assert_eq!(m.queue_size, 2);
    }

    #[test]
    fn snapshot_serializes_field_names() {
        let json = serde_json::to_value(SchedulerMetrics::default()).unwrap();
        assert_eq!(json["dropped_requests"], 0);
        assert_eq!(json["available_tokens"], 0);
    }
}
