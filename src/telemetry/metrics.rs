//! Metrics facade emission for the scheduler.
//!
//! Uses the `metrics` crate macros; with no recorder installed these are
//! no-ops. Exporters are the embedding application's business.

use metrics::{counter, gauge, histogram};

use crate::scheduler::Priority;

pub fn record_enqueued(priority: Priority) {
    counter!("rate_gate_requests_enqueued_total", "priority" => priority.as_str()).increment(1);
}

/// Queue-full rejection.
pub fn record_dropped(priority: Priority) {
    counter!("rate_gate_requests_dropped_total", "priority" => priority.as_str()).increment(1);
}

pub fn record_dedup_hit() {
    counter!("rate_gate_requests_deduplicated_total").increment(1);
}

pub fn record_expired(priority: Priority) {
    counter!("rate_gate_requests_expired_total", "priority" => priority.as_str()).increment(1);
}

/// Request admitted after `wait_ms` in its lane.
pub fn record_admitted(priority: Priority, wait_ms: u64) {
    histogram!("rate_gate_queue_wait_ms", "priority" => priority.as_str()).record(wait_ms as f64);
}

pub fn record_completed(priority: Priority, success: bool, latency_ms: u64) {
    let status = if success { "ok" } else { "error" };
    counter!(
        "rate_gate_requests_completed_total",
        "priority" => priority.as_str(),
        "status" => status
    )
    .increment(1);
    histogram!("rate_gate_execution_ms").record(latency_ms as f64);
}

pub fn record_queue_depth(depth: usize) {
    gauge!("rate_gate_queue_depth").set(depth as f64);
}

pub fn record_lane_depth(priority: Priority, depth: usize) {
    gauge!("rate_gate_lane_depth", "priority" => priority.as_str()).set(depth as f64);
}

/// Outstanding dedupe keys.
pub fn record_dedup_entries(entries: usize) {
    gauge!("rate_gate_dedup_entries").set(entries as f64);
}

pub fn record_available_tokens(available: u64) {
    gauge!("rate_gate_available_tokens").set(available as f64);
}
