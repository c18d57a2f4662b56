//! Worker loop - claim a task, visit it in isolation, back off

use crate::browser::DisplayProvider;
use crate::store::TaskStore;
use crate::task::{ClaimOutcome, ExecutionOutcome, Task};
use crate::worker::{Claimer, Executor, WorkerConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// What one loop iteration did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Iteration {
    NoTasks,
    StoreUnavailable,
    Conflict,
    Executed {
        task: Task,
        outcome: ExecutionOutcome,
    },
    /// The task was claimed but its execution context never started
    LaunchFailed { task: Task, reason: String },
}

/// Claim-and-execute loop of one worker process
pub struct WorkerLoop<S, E, D> {
    claimer: Claimer<S>,
    executor: E,
    display: D,
    config: WorkerConfig,
    shutdown: Arc<AtomicBool>,
}

impl<S, E, D> WorkerLoop<S, E, D>
where
    S: TaskStore,
    E: Executor,
    D: DisplayProvider,
{
    /// Create a new worker loop
    pub fn new(store: S, executor: E, display: D, config: WorkerConfig) -> Self {
        Self {
            claimer: Claimer::new(store, config.page_size),
            executor,
            display,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a handle to signal shutdown
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Daemon form: run iterations until shutdown is signaled
    pub async fn run(&self) {
        info!("Starting robotask worker...");
        info!("Store: {}", self.config.store.base_url);
        info!("Hard timeout: {:?}", self.config.hard_timeout);

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                info!("Shutdown signal received, stopping worker...");
                break;
            }

            self.run_once().await;
        }

        info!("Worker stopped");
    }

    /// Minimal form: one claim-and-execute cycle, including its backoff.
    pub async fn run_once(&self) -> Iteration {
        let claim = self.claimer.claim_next().await;
        debug!("Claim attempt: {}", claim.as_str());

        match claim {
            ClaimOutcome::NoTasksAvailable => {
                info!(
                    "No tasks found, sleeping for {:?}",
                    self.config.no_task_backoff
                );
                sleep(self.config.no_task_backoff).await;
                Iteration::NoTasks
            }
            ClaimOutcome::StoreUnavailable => {
                warn!(
                    "Task store unavailable, sleeping for {:?}",
                    self.config.no_task_backoff
                );
                sleep(self.config.no_task_backoff).await;
                Iteration::StoreUnavailable
            }
            ClaimOutcome::Conflict => {
                info!(
                    "Lost the race for a task, sleeping for {:?}",
                    self.config.conflict_backoff
                );
                sleep(self.config.conflict_backoff).await;
                Iteration::Conflict
            }
            ClaimOutcome::Claimed(task) => self.execute(task).await,
        }
    }

    async fn execute(&self, task: Task) -> Iteration {
        info!("Claimed task {}: {}", task.id, task.url);

        let display = match self.display.start().await {
            Ok(display) => display,
            Err(e) => {
                error!(
                    "Task {} ({}) dropped: could not start display: {}",
                    task.id, task.url, e
                );
                sleep(self.config.error_backoff).await;
                return Iteration::LaunchFailed {
                    task,
                    reason: e.to_string(),
                };
            }
        };

        let result = self
            .executor
            .execute(&task.url, self.config.hard_timeout, &display.env())
            .await;

        display.stop().await;

        match result {
            Ok(outcome) => {
                match &outcome {
                    ExecutionOutcome::Completed => {
                        info!("Task {} completed: {}", task.id, task.url)
                    }
                    ExecutionOutcome::TimedOut => warn!(
                        "Task {} timed out after {:?}: {}",
                        task.id, self.config.hard_timeout, task.url
                    ),
                    ExecutionOutcome::Crashed(reason) => {
                        error!("Task {} crashed ({}): {}", task.id, reason, task.url)
                    }
                }
                Iteration::Executed { task, outcome }
            }
            Err(e) => {
                error!(
                    "Task {} ({}) dropped: could not start execution context: {}",
                    task.id, task.url, e
                );
                sleep(self.config.error_backoff).await;
                Iteration::LaunchFailed {
                    task,
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Setup signal handlers for graceful shutdown
pub fn setup_signal_handler(shutdown: Arc<AtomicBool>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating shutdown...");
                shutdown.store(true, Ordering::Relaxed);
            }
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        }
    });
}
