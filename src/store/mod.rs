//! Task store access
//!
//! The store is the only shared resource in the fleet. Its delete-if-present
//! semantics is the sole source of mutual exclusion between workers.

pub mod client;

pub use client::{StoreClientConfig, TaskStoreClient};

use crate::error::Result;
use crate::task::{CandidateBatch, ClaimResponse, TaskId};
use async_trait::async_trait;
use std::sync::Arc;

/// Contract the worker needs from the remote task store.
///
/// Implementations never retry; retry and backoff policy belong to the
/// worker loop.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// List up to `max_count` tasks, most urgent first.
    ///
    /// Any failure is `RobotaskError::StoreUnavailable`; partial data is never
    /// returned.
    async fn fetch_candidates(&self, max_count: usize) -> Result<CandidateBatch>;

    /// Delete the task if it is still present.
    async fn claim(&self, task_id: TaskId) -> Result<ClaimResponse>;
}

#[async_trait]
impl<T: TaskStore + ?Sized> TaskStore for Arc<T> {
    async fn fetch_candidates(&self, max_count: usize) -> Result<CandidateBatch> {
        (**self).fetch_candidates(max_count).await
    }

    async fn claim(&self, task_id: TaskId) -> Result<ClaimResponse> {
        (**self).claim(task_id).await
    }
}
