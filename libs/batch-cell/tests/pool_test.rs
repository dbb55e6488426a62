use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;
use tokio::time::{sleep, Duration};

use batch_cell::*;

fn worker_config(worker_count: usize, grace_ms: u64) -> WorkerConfig {
    WorkerConfig {
        pool_id: "test-pool".to_string(),
        worker_count,
        graceful_shutdown_timeout: Duration::from_millis(grace_ms),
    }
}

#[tokio::test]
async fn test_never_runs_more_tasks_than_workers() {
    let pool = BatchWorkPool::start(worker_config(3, 1_000));
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        let handle = pool
            .submit(async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            })
            .await
            .expect("pool should accept work");
        handles.push(handle);
    }

    for handle in handles {
        handle.join().await.expect("task should complete");
    }

    assert_eq!(peak.load(Ordering::SeqCst), 3);
    assert_eq!(pool.stats().await.completed, 10);

    pool.shutdown().await;
}

#[tokio::test]
async fn test_run_keyed_pairs_each_key_with_its_result() {
    let pool = BatchWorkPool::start(worker_config(2, 1_000));

    let results = pool
        .run_keyed(vec![3_i64, 1, 2], |&n| async move {
            // Larger keys finish first so completion order differs from submission order.
            sleep(Duration::from_millis(10 * (4 - n as u64))).await;
            n * 10
        })
        .await
        .unwrap();

    let pairs: Vec<(i64, i64)> = results
        .into_iter()
        .map(|(key, out)| (key, out.unwrap()))
        .collect();
    assert_eq!(pairs, vec![(3, 30), (1, 10), (2, 20)]);

    pool.shutdown().await;
}

#[tokio::test]
async fn test_panicking_task_does_not_kill_worker() {
    let pool = BatchWorkPool::start(worker_config(1, 1_000));

    let bad = pool
        .submit(async {
            panic!("boom");
        })
        .await
        .unwrap();
    assert_matches!(bad.join().await, Err(BatchError::TaskLost));

    let good = pool.submit(async { 7 }).await.unwrap();
    assert_eq!(good.join().await, Ok(7));

    let stats = pool.stats().await;
    assert_eq!(stats.panicked, 1);
    assert_eq!(stats.completed, 1);

    pool.shutdown().await;
}

#[tokio::test]
async fn test_submit_after_shutdown_is_rejected() {
    let pool = BatchWorkPool::start(worker_config(2, 1_000));
    let report = pool.shutdown().await;
    assert!(report.drained);
    assert!(pool.is_shutdown().await);

    let result = pool.submit(async { 1 }).await;
    assert_matches!(result, Err(BatchError::PoolShutdown { pool_id }) if pool_id == "test-pool");
    assert!(!pool.stats().await.accepting);
}

#[tokio::test]
async fn test_shutdown_drains_queued_work() {
    let pool = BatchWorkPool::start(worker_config(2, 2_000));

    let mut handles = Vec::new();
    for i in 0..6 {
        let handle = pool
            .submit(async move {
                sleep(Duration::from_millis(10)).await;
                i
            })
            .await
            .unwrap();
        handles.push(handle);
    }

    let report = pool.shutdown().await;
    assert_eq!(report, ShutdownReport { drained: true, aborted_workers: 0 });

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().await, Ok(i));
    }
}

#[tokio::test]
async fn test_shutdown_aborts_stragglers_after_grace_period() {
    let pool = BatchWorkPool::start(worker_config(2, 100));

    let hung = pool
        .submit(async {
            sleep(Duration::from_secs(60)).await;
        })
        .await
        .unwrap();
    let quick = pool.submit(async { "done" }).await.unwrap();
    assert_eq!(quick.join().await, Ok("done"));

    let started = tokio::time::Instant::now();
    let report = pool.shutdown().await;

    assert!(!report.drained);
    assert_eq!(report.aborted_workers, 1);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_matches!(hung.join().await, Err(BatchError::TaskLost));

    // A second shutdown is a no-op.
    assert!(pool.shutdown().await.drained);
}

#[tokio::test]
async fn test_shutdown_aborts_only_unfinished_workers() {
    let pool = BatchWorkPool::start(worker_config(3, 100));

    let mut hung = Vec::new();
    for _ in 0..2 {
        let handle = pool
            .submit(async {
                sleep(Duration::from_secs(60)).await;
            })
            .await
            .unwrap();
        hung.push(handle);
    }
    let quick = pool.submit(async { 3 }).await.unwrap();
    assert_eq!(quick.join().await, Ok(3));

    let report = pool.shutdown().await;

    assert_eq!(report, ShutdownReport { drained: false, aborted_workers: 2 });
    for handle in hung {
        assert_matches!(handle.join().await, Err(BatchError::TaskLost));
    }
    assert_matches!(pool.submit(async { 4 }).await, Err(BatchError::PoolShutdown { .. }));
}

#[tokio::test]
async fn test_worker_count_is_at_least_one() {
    let pool = BatchWorkPool::start(worker_config(0, 100));
    assert_eq!(pool.worker_count(), 1);

    let handle = pool.submit(async { 1 + 1 }).await.unwrap();
    tokio_test::assert_ok!(handle.join().await);

    pool.shutdown().await;
}
