//! Integration tests for the scheduler's public surface.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rate_gate::scheduler::{
    EnqueueOptions, LaneSet, Priority, RequestQueueConfig, RequestScheduler, SchedulerConfig,
    SchedulerError, TokenBucket, TokenBucketConfig,
};

fn config(max_tokens: u64, refill_rate: u64, max_pending: usize) -> SchedulerConfig {
    SchedulerConfig {
        bucket: TokenBucketConfig { max_tokens, refill_rate, refill_interval_ms: 100 },
        queue: RequestQueueConfig { max_pending, default_timeout_ms: None },
    }
}

#[test]
fn lane_set_orders_by_priority() {
    let mut lanes: LaneSet<&str> = LaneSet::new();

    lanes.push_back("low", Priority::Low);
    lanes.push_back("high", Priority::High);
    lanes.push_back("medium", Priority::Medium);

    assert_eq!(lanes.pop_next().map(|(_, v)| v), Some("high"));
    assert_eq!(lanes.pop_next().map(|(_, v)| v), Some("medium"));
    assert_eq!(lanes.pop_next().map(|(_, v)| v), Some("low"));
}

#[test]
fn lane_set_fifo_within_same_priority() {
    let mut lanes: LaneSet<&str> = LaneSet::new();

    lanes.push_back("first", Priority::Medium);
    lanes.push_back("second", Priority::Medium);
    lanes.push_back("third", Priority::Medium);

    assert_eq!(lanes.lane_len(Priority::Medium), 3);
    assert_eq!(lanes.pop_next().map(|(_, v)| v), Some("first"));
    assert_eq!(lanes.pop_next().map(|(_, v)| v), Some("second"));
    assert_eq!(lanes.pop_next().map(|(_, v)| v), Some("third"));
}

#[test]
fn token_bucket_never_leaves_bounds() {
    let mut bucket = TokenBucket::new(&TokenBucketConfig {
        max_tokens: 10,
        refill_rate: 4,
        refill_interval_ms: 100,
    });
    for step in 0..50u64 {
        let _ = bucket.try_reserve(step % 13);
        if step % 3 == 0 {
            bucket.refill();
        }
        assert!(bucket.available() <= 10);
    }
}

#[tokio::test]
async fn third_request_rejected_when_two_pending() {
    let scheduler: RequestScheduler<u32, String> = RequestScheduler::new(config(10, 5, 2));

    let a = scheduler.enqueue(|| async { Ok(1) }, EnqueueOptions::new(Priority::Medium, 1));
    let b = scheduler.enqueue(|| async { Ok(2) }, EnqueueOptions::new(Priority::Medium, 1));
    let c = scheduler.enqueue(|| async { Ok(3) }, EnqueueOptions::new(Priority::Medium, 1));

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(c.unwrap_err(), SchedulerError::QueueFull { max_pending: 2 });
    assert_eq!(scheduler.metrics().dropped_requests, 1);

    // Once drained, the queue accepts work again.
    assert_eq!(a.unwrap().await, Ok(1));
    assert_eq!(b.unwrap().await, Ok(2));
    let d = scheduler
        .enqueue(|| async { Ok(4) }, EnqueueOptions::new(Priority::Medium, 1))
        .unwrap();
    assert_eq!(d.await, Ok(4));
}

#[tokio::test(start_paused = true)]
async fn high_priority_overtakes_starved_lower_lane() {
    let scheduler: RequestScheduler<&'static str, String> = RequestScheduler::new(config(10, 5, 16));
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let record = |name: &'static str| {
        let order = order.clone();
        move || async move {
            order.lock().push(name);
            Ok(name)
        }
    };

    let drain = scheduler
        .enqueue(record("drain"), EnqueueOptions::new(Priority::Low, 10))
        .unwrap();
    let starved = scheduler
        .enqueue(record("low-heavy"), EnqueueOptions::new(Priority::Low, 10))
        .unwrap();
    drain.await.unwrap();

    // Arrives later but sits in a higher lane.
    let urgent = scheduler
        .enqueue(record("high"), EnqueueOptions::new(Priority::High, 5))
        .unwrap();

    assert_eq!(urgent.await, Ok("high"));
    assert_eq!(starved.await, Ok("low-heavy"));
    assert_eq!(*order.lock(), vec!["drain", "high", "low-heavy"]);
}

#[tokio::test(start_paused = true)]
async fn duplicates_share_failure() {
    let scheduler: RequestScheduler<u32, String> = RequestScheduler::new(config(10, 5, 16));
    let calls = Arc::new(AtomicUsize::new(0));

    let failing = |calls: Arc<AtomicUsize>| {
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err::<u32, _>("account not found".to_string())
        }
    };
    let opts = || EnqueueOptions::new(Priority::Medium, 3).dedupe_key("account:0x1");

    let first = scheduler.enqueue(failing(calls.clone()), opts()).unwrap();
    let second = scheduler.enqueue(failing(calls.clone()), opts()).unwrap();

    let expected = Err(SchedulerError::Work("account not found".to_string()));
    assert_eq!(first.await, expected);
    assert_eq!(second.await, expected);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.metrics().failed_requests, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn works_on_multi_thread_runtime() {
    let handle = tokio::spawn(async {
        let scheduler: RequestScheduler<usize, String> =
            RequestScheduler::new(config(1000, 100, 256));
        let pending: Vec<_> = (0..50)
            .map(|i| {
                let priority = Priority::ALL[i % 3];
                scheduler
                    .enqueue(move || async move { Ok(i) }, EnqueueOptions::new(priority, 1))
                    .unwrap()
            })
            .collect();
        let results = futures::future::join_all(pending).await;
        (results, scheduler.metrics())
    });

    let (results, metrics) = handle.await.unwrap();
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(metrics.processed_requests, 50);
    assert_eq!(metrics.queue_size, 0);
}
