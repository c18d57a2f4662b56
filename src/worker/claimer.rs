//! Claimer - fetch candidates, pick one, try to delete it from the store

use crate::selector;
use crate::store::TaskStore;
use crate::task::{ClaimOutcome, ClaimResponse};
use tracing::{info, warn};

/// Single-attempt claimer.
///
/// Retrying is left to the worker loop so all backoff decisions live there.
pub struct Claimer<S> {
    store: S,
    page_size: usize,
}

impl<S: TaskStore> Claimer<S> {
    pub fn new(store: S, page_size: usize) -> Self {
        Self { store, page_size }
    }

    /// Try to take ownership of the most urgent task.
    pub async fn claim_next(&self) -> ClaimOutcome {
        let batch = match self.store.fetch_candidates(self.page_size).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Could not fetch candidate tasks: {}", e);
                return ClaimOutcome::StoreUnavailable;
            }
        };

        let task = match selector::select_random(&batch) {
            Some(task) => task.clone(),
            None => return ClaimOutcome::NoTasksAvailable,
        };
        info!(
            "Selected task {} (priority {}): {}",
            task.id, task.priority, task.url
        );

        match self.store.claim(task.id).await {
            Ok(ClaimResponse::Removed) => ClaimOutcome::Claimed(task),
            Ok(ClaimResponse::Rejected(status)) => {
                info!(
                    "Claim of task {} rejected with status {} (someone else probably got it)",
                    task.id, status
                );
                ClaimOutcome::Conflict
            }
            Err(e) => {
                warn!("Could not claim task {}: {}", task.id, e);
                ClaimOutcome::StoreUnavailable
            }
        }
    }
}
