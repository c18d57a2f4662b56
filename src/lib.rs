//! robotask - distributed URL-visit worker
//!
//! Workers on any number of machines share one task store. Each worker
//! repeatedly claims the most urgent task it can win by deleting it from the
//! store, then visits the task's URL in a headed Chrome with the observation
//! extension loaded, inside a child process that is killed if it outlives the
//! hard timeout.
//!
//! Modules:
//! - `store`: task store contract and its HTTP client
//! - `selector`: priority-tiered random selection
//! - `worker`: claimer, isolated executor and the worker loop
//! - `browser`: the visit operation, Chrome launcher and virtual display
//! - `scheduler` / `db`: bulk loading of URL lists into the store's table

pub mod browser;
pub mod db;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod selector;
pub mod store;
pub mod task;
pub mod worker;

pub use error::{Result, RobotaskError};
pub use store::{TaskStore, TaskStoreClient};
pub use task::{CandidateBatch, ClaimOutcome, ClaimResponse, ExecutionOutcome, Task, TaskId};
pub use worker::{Claimer, Executor, IsolatedExecutor, Iteration, WorkerConfig, WorkerLoop};
