//! `simulate` subcommand: drive a scheduler with a synthetic request mix.
//!
//! Useful for eyeballing how a bucket configuration behaves under load
//! before wiring it in front of a real API client.

use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;

use crate::scheduler::{
    EnqueueOptions, Priority, RequestScheduler, SchedulerConfig, SchedulerError, SchedulerMetrics,
};

/// Synthetic operation classes and their bucket cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightClass {
    Trading,
    Info,
    Heavy,
}

impl WeightClass {
    pub fn weight(self) -> u64 {
        match self {
            Self::Trading => 1,
            Self::Info => 2,
            Self::Heavy => 20,
        }
    }

    pub fn priority(self) -> Priority {
        match self {
            Self::Trading => Priority::High,
            Self::Info => Priority::Medium,
            Self::Heavy => Priority::Low,
        }
    }

    /// Deterministic mix: mostly info, some trading, a few heavy.
    fn for_index(i: usize) -> Self {
        match i % 10 {
            0 | 5 => Self::Trading,
            9 => Self::Heavy,
            _ => Self::Info,
        }
    }
}

/// Outcome summary printed as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub submitted: usize,
    pub rejected: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub interrupted: bool,
    pub metrics: SchedulerMetrics,
}

/// Submit `requests` synthetic calls and wait for all of them to settle.
pub async fn run_simulation(config: SchedulerConfig, requests: usize) -> SimulationReport {
    let scheduler: RequestScheduler<String, String> = RequestScheduler::new(config);
    let mut pending = Vec::with_capacity(requests);
    let mut rejected = 0;

    for i in 0..requests {
        let class = WeightClass::for_index(i);
        let mut options = EnqueueOptions::new(class.priority(), class.weight());
        if class == WeightClass::Info {
            // A handful of hot keys so concurrent lookups collapse.
            options = options.dedupe_key(format!("info:{}", i % 4));
        }
        let label = format!("{class:?}#{i}");
        match scheduler.enqueue(
            move || async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(label)
            },
            options,
        ) {
            Ok(p) => pending.push(p),
            Err(e) => {
                debug_assert!(e.is_rejection());
                rejected += 1;
            }
        }
    }

    let submitted = pending.len();
    let (results, interrupted) = tokio::select! {
        results = join_all(pending) => (results, false),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, tearing down scheduler");
            scheduler.destroy();
            (Vec::new(), true)
        }
    };

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let failed = results
        .iter()
        .filter(|r| matches!(r, Err(e) if *e != SchedulerError::ShutDown))
        .count();
    let metrics = scheduler.metrics();
    scheduler.destroy();

    SimulationReport { submitted, rejected, succeeded, failed, interrupted, metrics }
}
