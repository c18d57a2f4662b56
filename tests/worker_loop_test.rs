mod common;

use common::{task, FakeDisplay, FakeExecutor, FakeStore};
use robotask::{ExecutionOutcome, IsolatedExecutor, Iteration, WorkerConfig, WorkerLoop};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn config() -> WorkerConfig {
    WorkerConfig::builder()
        .hard_timeout(Duration::from_secs(90))
        .no_task_backoff(Duration::from_secs(30))
        .conflict_backoff(Duration::from_secs(5))
        .error_backoff(Duration::from_secs(20))
        .build()
}

#[tokio::test(start_paused = true)]
async fn test_empty_store_backs_off_without_executing() {
    let store = Arc::new(FakeStore::default());
    let executor = FakeExecutor::returning(ExecutionOutcome::Completed);
    let display = FakeDisplay::default();
    let worker = WorkerLoop::new(store, executor.clone(), display.clone(), config());

    let start = Instant::now();
    assert_eq!(worker.run_once().await, Iteration::NoTasks);

    assert_eq!(start.elapsed(), Duration::from_secs(30));
    assert_eq!(executor.call_count(), 0);
    assert_eq!(display.started.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_store_uses_no_task_backoff() {
    let store = Arc::new(FakeStore {
        unavailable: true,
        ..Default::default()
    });
    let executor = FakeExecutor::returning(ExecutionOutcome::Completed);
    let worker = WorkerLoop::new(store, executor.clone(), FakeDisplay::default(), config());

    let start = Instant::now();
    assert_eq!(worker.run_once().await, Iteration::StoreUnavailable);

    assert_eq!(start.elapsed(), Duration::from_secs(30));
    assert_eq!(executor.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_lost_race_uses_conflict_backoff() {
    let store = Arc::new(FakeStore {
        reject_deletes_with: Some(404),
        ..FakeStore::with_tasks(vec![task(7, "taken.com", 1)])
    });
    let executor = FakeExecutor::returning(ExecutionOutcome::Completed);
    let worker = WorkerLoop::new(store, executor.clone(), FakeDisplay::default(), config());

    let start = Instant::now();
    assert_eq!(worker.run_once().await, Iteration::Conflict);

    assert_eq!(start.elapsed(), Duration::from_secs(5));
    assert_eq!(executor.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_claimed_task_is_executed_with_hard_timeout_and_display() {
    let store = Arc::new(FakeStore::with_tasks(vec![task(3, "https://example.com", 1)]));
    let executor = FakeExecutor::returning(ExecutionOutcome::Completed);
    let display = FakeDisplay::default();
    let worker = WorkerLoop::new(
        Arc::clone(&store),
        executor.clone(),
        display.clone(),
        config(),
    );

    let start = Instant::now();
    let iteration = worker.run_once().await;

    assert_eq!(
        iteration,
        Iteration::Executed {
            task: task(3, "https://example.com", 1),
            outcome: ExecutionOutcome::Completed,
        }
    );
    // Successful executions go straight to the next iteration
    assert_eq!(start.elapsed(), Duration::ZERO);

    let (url, hard_timeout, env) = executor.last_call().unwrap();
    assert_eq!(url, "https://example.com");
    assert_eq!(hard_timeout, Duration::from_secs(90));
    assert_eq!(env, vec![("DISPLAY".to_string(), ":4242".to_string())]);

    assert_eq!(display.started.load(Ordering::SeqCst), 1);
    assert_eq!(display.running.load(Ordering::SeqCst), 0);
    assert!(store.remaining().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_execution_stops_display_and_continues() {
    let store = Arc::new(FakeStore::with_tasks(vec![task(4, "slow.com", 1)]));
    let executor = FakeExecutor::returning(ExecutionOutcome::TimedOut);
    let display = FakeDisplay::default();
    let worker = WorkerLoop::new(store, executor, display.clone(), config());

    match worker.run_once().await {
        Iteration::Executed { task, outcome } => {
            assert_eq!(task.url, "slow.com");
            assert_eq!(outcome, ExecutionOutcome::TimedOut);
        }
        other => panic!("expected an execution, got {:?}", other),
    }
    assert_eq!(display.running.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_launch_failure_uses_error_backoff_and_drops_task() {
    let store = Arc::new(FakeStore::with_tasks(vec![task(5, "a.com", 1)]));
    let executor = FakeExecutor::failing_to_launch();
    let display = FakeDisplay::default();
    let worker = WorkerLoop::new(Arc::clone(&store), executor, display.clone(), config());

    let start = Instant::now();
    let iteration = worker.run_once().await;

    assert!(matches!(iteration, Iteration::LaunchFailed { ref task, .. } if task.url == "a.com"));
    assert_eq!(start.elapsed(), Duration::from_secs(20));
    assert_eq!(display.running.load(Ordering::SeqCst), 0);
    // The claim already happened; the task is not put back
    assert!(store.remaining().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_display_failure_skips_execution() {
    let store = Arc::new(FakeStore::with_tasks(vec![task(6, "b.com", 1)]));
    let executor = FakeExecutor::returning(ExecutionOutcome::Completed);
    let display = FakeDisplay {
        fail: true,
        ..Default::default()
    };
    let worker = WorkerLoop::new(store, executor.clone(), display, config());

    let start = Instant::now();
    assert!(matches!(
        worker.run_once().await,
        Iteration::LaunchFailed { .. }
    ));
    assert_eq!(start.elapsed(), Duration::from_secs(20));
    assert_eq!(executor.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_daemon_stops_when_shutdown_is_signaled() {
    let store = Arc::new(FakeStore::default());
    let executor = FakeExecutor::returning(ExecutionOutcome::Completed);
    let worker = Arc::new(WorkerLoop::new(
        Arc::clone(&store),
        executor,
        FakeDisplay::default(),
        config(),
    ));
    let shutdown = worker.shutdown_handle();

    let running = tokio::spawn({
        let worker = Arc::clone(&worker);
        async move { worker.run().await }
    });

    tokio::time::sleep(Duration::from_secs(65)).await;
    shutdown.store(true, Ordering::Relaxed);
    running.await.unwrap();

    // Polled at 0s, 30s and 60s, then saw the flag after the third backoff
    assert_eq!(store.fetches.load(Ordering::SeqCst), 3);
}

#[cfg(unix)]
#[tokio::test]
async fn test_hung_visit_is_killed_and_loop_moves_on() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("pid");
    let script = format!("echo $$ > {}; sleep 600", pid_file.display());
    let executor = IsolatedExecutor::new("/bin/sh", vec!["-c".to_string(), script]);

    let store = Arc::new(FakeStore::with_tasks(vec![task(8, "https://hang.example", 1)]));
    let display = FakeDisplay::default();
    let config = WorkerConfig::builder()
        .hard_timeout(Duration::from_secs(1))
        .build();
    let worker = WorkerLoop::new(store, executor, display.clone(), config);

    let start = std::time::Instant::now();
    let iteration = worker.run_once().await;

    assert_eq!(
        iteration,
        Iteration::Executed {
            task: task(8, "https://hang.example", 1),
            outcome: ExecutionOutcome::TimedOut,
        }
    );
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(display.running.load(Ordering::SeqCst), 0);

    let pid: i32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert!(common::eventually_gone(pid).await, "visit process {} survived", pid);
}
