//! Admission loop and refill timer.
//!
//! The admission loop is the only consumer of the lanes. It serves the
//! highest non-empty lane, debits the bucket and runs the request's work to
//! completion before looking at the next one. A request that cannot be
//! paid for goes back to the head of its lane.

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::error::SchedulerError;
use super::queue::SchedulerCore;
use super::queued_request::QueuedRequest;
use crate::telemetry::{self, RequestSpan, SpanExt};

/// What the loop should do next.
enum Step<T, E> {
    Admit(QueuedRequest<T, E>),
    /// Nothing admissible; sleep until woken or until the deadline.
    Idle(Option<Instant>),
}

/// Spawn the refill timer. Ticks every `refill_interval_ms`, starting one
/// interval from now, until `shutdown` fires.
pub(super) fn spawn_refill_timer<T, E>(
    core: Arc<SchedulerCore<T, E>>,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    tokio::spawn(async move {
        let period = core.config.bucket.refill_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let available = core.bucket.lock().refill();
                    telemetry::record_available_tokens(available);
                    core.wake.notify_one();
                }
            }
        }
        tracing::debug!("refill timer stopped");
    })
}

/// Spawn the admission loop. Returns a handle for shutdown.
pub(super) fn spawn_admission_loop<T, E>(
    core: Arc<SchedulerCore<T, E>>,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + fmt::Display + 'static,
{
    tokio::spawn(async move {
        admission_loop(&core, shutdown).await;
    })
}

async fn admission_loop<T, E>(core: &SchedulerCore<T, E>, shutdown: CancellationToken)
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + fmt::Display + 'static,
{
    loop {
        if shutdown.is_cancelled() {
            break;
        }
        match next_step(core) {
            Step::Admit(request) => execute_request(core, request).await,
            Step::Idle(deadline) => {
                tokio::select! {
                    biased;
                    () = shutdown.cancelled() => break,
                    () = core.wake.notified() => {}
                    () = sleep_until(deadline) => {}
                }
            }
        }
    }
    tracing::info!("admission loop: shutdown signal received");
}

/// Expire overdue requests, then try to admit the head of the highest lane.
fn next_step<T, E>(core: &SchedulerCore<T, E>) -> Step<T, E> {
    let now = Instant::now();
    let mut state = core.state.lock();

    let expired = state.lanes.remove_where(|r| r.is_expired(now));
    for request in &expired {
        if let Some(key) = request.dedupe_key.as_deref() {
            state.dedup.remove(key, request.id);
        }
    }

    let step = match state.lanes.pop_next() {
        None => Step::Idle(None),
        Some((priority, request)) => {
            if core.bucket.lock().try_reserve(request.weight) {
                Step::Admit(request)
            } else {
                tracing::debug!(
                    request_id = request.id,
                    weight = request.weight,
                    %priority,
                    "insufficient tokens, holding lane"
                );
                state.lanes.push_front(request, priority);
                Step::Idle(state.lanes.iter().filter_map(|r| r.deadline).min())
            }
        }
    };
    state.publish_depth();
    drop(state);

    for request in expired {
        let waited_ms = request.waited_ms(now);
        core.counters.record_expired();
        telemetry::record_expired(request.priority);
        tracing::warn!(
            request_id = request.id,
            priority = %request.priority,
            waited_ms,
            "request deadline elapsed while queued"
        );
        request.settle(Err(SchedulerError::DeadlineExceeded { waited_ms }));
    }
    step
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn execute_request<T, E>(core: &SchedulerCore<T, E>, request: QueuedRequest<T, E>)
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + fmt::Display + 'static,
{
    let QueuedRequest {
        id,
        priority,
        weight,
        work,
        enqueued_at,
        dedupe_key,
        response_tx,
        ..
    } = request;

    let span = RequestSpan::new(id, priority, weight);
    let wait_ms = enqueued_at.elapsed().as_millis() as u64;
    span.record("wait_ms", wait_ms);
    telemetry::record_admitted(priority, wait_ms);
    tracing::debug!(parent: &span, "request admitted");

    core.counters.begin_execution();
    let start = Instant::now();
    // Own task so a panic settles this request instead of killing the loop.
    let joined = tokio::spawn(async move { work().await }.instrument(span.clone())).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let result = match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(SchedulerError::Work(e)),
        Err(e) if e.is_panic() => Err(SchedulerError::WorkPanicked),
        Err(_) => Err(SchedulerError::ShutDown),
    };

    span.record("latency_ms", latency_ms);
    span.record_result(&result);

    core.release_dedupe_key(dedupe_key.as_deref(), id);
    core.counters.finish_execution(result.is_ok());
    telemetry::record_completed(priority, result.is_ok(), latency_ms);

    let _ = response_tx.send(result);
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
