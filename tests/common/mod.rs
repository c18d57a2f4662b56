//! Test doubles for the store, the executor and the display.

#![allow(dead_code)]

use async_trait::async_trait;
use robotask::browser::{DisplayProvider, DisplaySession};
use robotask::{
    CandidateBatch, ClaimResponse, ExecutionOutcome, Executor, Result, RobotaskError, Task,
    TaskId, TaskStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn task(id: i64, url: &str, priority: i64) -> Task {
    Task {
        id: TaskId(id),
        url: url.to_string(),
        priority,
    }
}

/// In-memory store with atomic delete-if-present
#[derive(Default)]
pub struct FakeStore {
    pub tasks: Mutex<Vec<Task>>,
    pub fetches: AtomicUsize,
    pub deletes: AtomicUsize,
    /// Answer every list request with an error
    pub unavailable: bool,
    /// Answer every delete with this status instead of deleting
    pub reject_deletes_with: Option<u16>,
}

impl FakeStore {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            ..Default::default()
        }
    }

    pub fn remaining(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskStore for FakeStore {
    async fn fetch_candidates(&self, max_count: usize) -> Result<CandidateBatch> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(RobotaskError::StoreUnavailable("connection refused".to_string()));
        }
        let snapshot = self.tasks.lock().unwrap().clone();
        // Let other claimers interleave between list and delete
        tokio::task::yield_now().await;
        Ok(CandidateBatch::from_page(snapshot, max_count))
    }

    async fn claim(&self, task_id: TaskId) -> Result<ClaimResponse> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.reject_deletes_with {
            return Ok(ClaimResponse::Rejected(status));
        }
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.iter().position(|t| t.id == task_id) {
            Some(index) => {
                tasks.remove(index);
                Ok(ClaimResponse::Removed)
            }
            None => Ok(ClaimResponse::Rejected(404)),
        }
    }
}

type Call = (String, Duration, Vec<(String, String)>);

/// Executor recording its calls and answering with a fixed outcome
#[derive(Clone)]
pub struct FakeExecutor {
    outcome: Option<ExecutionOutcome>,
    pub calls: Arc<Mutex<Vec<Call>>>,
}

impl FakeExecutor {
    pub fn returning(outcome: ExecutionOutcome) -> Self {
        Self {
            outcome: Some(outcome),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Executor whose execution context never starts
    pub fn failing_to_launch() -> Self {
        Self {
            outcome: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<Call> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn execute(
        &self,
        url: &str,
        hard_timeout: Duration,
        env: &[(String, String)],
    ) -> Result<ExecutionOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), hard_timeout, env.to_vec()));
        match &self.outcome {
            Some(outcome) => Ok(outcome.clone()),
            None => Err(RobotaskError::Launch {
                program: "robotask".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            }),
        }
    }
}

/// Display counting how many sessions are currently running
#[derive(Clone, Default)]
pub struct FakeDisplay {
    pub started: Arc<AtomicUsize>,
    pub running: Arc<AtomicUsize>,
    pub fail: bool,
}

struct FakeDisplaySession {
    running: Arc<AtomicUsize>,
}

#[async_trait]
impl DisplayProvider for FakeDisplay {
    async fn start(&self) -> Result<Box<dyn DisplaySession>> {
        if self.fail {
            return Err(RobotaskError::Display("Xvfb missing".to_string()));
        }
        self.started.fetch_add(1, Ordering::SeqCst);
        self.running.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeDisplaySession {
            running: Arc::clone(&self.running),
        }))
    }
}

#[async_trait]
impl DisplaySession for FakeDisplaySession {
    fn env(&self) -> Vec<(String, String)> {
        vec![("DISPLAY".to_string(), ":4242".to_string())]
    }

    async fn stop(self: Box<Self>) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Whether `pid` is a live process (zombies count as gone)
pub fn is_running(pid: i32) -> bool {
    // Reparented zombies may never be reaped inside a container
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit(')')
            .next()
            .and_then(|rest| rest.split_whitespace().next())
            .map(|state| state != "Z" && state != "X")
            .unwrap_or(false),
        Err(_) => false,
    }
}

pub async fn eventually_gone(pid: i32) -> bool {
    for _ in 0..50 {
        if !is_running(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}
