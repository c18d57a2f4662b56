//! Task model shared by the store client, the selector and the worker loop

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Tasks
// ============================================================================

/// Store-assigned task identifier. Opaque to the worker; only ever echoed back
/// to the store in the claim request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task - one row of the robotask table as returned by the store API.
///
/// Lower `priority` values are more urgent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub url: String,
    pub priority: i64,
}

/// Page of candidate tasks, ordered ascending by priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateBatch {
    tasks: Vec<Task>,
}

impl CandidateBatch {
    /// Build a batch from a page returned by the store.
    ///
    /// The store is asked for ascending priority order; a stable sort keeps its
    /// order among equal priorities while guaranteeing the first element is
    /// the most urgent one. The page is capped at `max_count` tasks.
    pub fn from_page(mut tasks: Vec<Task>, max_count: usize) -> Self {
        tasks.sort_by_key(|t| t.priority);
        tasks.truncate(max_count);
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn first(&self) -> Option<&Task> {
        self.tasks.first()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result of one claim attempt by the Claimer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The task was removed from the store by us; we own it now.
    Claimed(Task),
    /// Another worker removed the task first.
    Conflict,
    NoTasksAvailable,
    StoreUnavailable,
}

impl ClaimOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimOutcome::Claimed(_) => "claimed",
            ClaimOutcome::Conflict => "conflict",
            ClaimOutcome::NoTasksAvailable => "no_tasks",
            ClaimOutcome::StoreUnavailable => "store_unavailable",
        }
    }
}

/// Store answer to a delete-if-present request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimResponse {
    /// 204: the task was present and is now gone.
    Removed,
    /// Any other definitive status, usually because the task was already deleted.
    Rejected(u16),
}

/// How the supervised visit of a claimed task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The execution context exited cleanly. Soft failures inside the visit
    /// (page-load timeout, tab crash) are reported this way too.
    Completed,
    /// The hard timeout expired and the execution context was killed.
    TimedOut,
    /// The execution context died on its own.
    Crashed(String),
}

impl ExecutionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionOutcome::Completed => "completed",
            ExecutionOutcome::TimedOut => "timed_out",
            ExecutionOutcome::Crashed(_) => "crashed",
        }
    }
}
