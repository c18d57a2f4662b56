//! Priority-tiered task selection
//!
//! Every worker in the fleet sees roughly the same page of candidates. Picking
//! the first one would make every worker race for the same row, so we pick
//! uniformly among all tasks tied for the most urgent priority on the page.

use crate::task::{CandidateBatch, Task};
use rand::seq::SliceRandom;
use rand::Rng;

/// Pick one task among those sharing the first task's priority.
///
/// Ties are only detected within the fetched page.
pub fn select<'a, R: Rng + ?Sized>(batch: &'a CandidateBatch, rng: &mut R) -> Option<&'a Task> {
    let top_priority = batch.first()?.priority;
    let tied: Vec<&Task> = batch
        .tasks()
        .iter()
        .take_while(|t| t.priority == top_priority)
        .collect();

    tied.choose(rng).copied()
}

/// Same as [`select`] using the thread-local RNG
pub fn select_random(batch: &CandidateBatch) -> Option<&Task> {
    let mut rng = rand::thread_rng();
    select(batch, &mut rng)
}
