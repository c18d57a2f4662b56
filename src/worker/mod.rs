//! Worker module: claim tasks from the store and visit them in isolation
//!
//! This module provides:
//! - Claimer: one fetch + select + delete attempt
//! - IsolatedExecutor: supervised child process with a hard timeout
//! - WorkerLoop: the claim-and-execute loop with its backoff policy
//! - WorkerConfig: Configuration for the worker

pub mod claimer;
pub mod config;
pub mod executor;
pub mod worker_loop;

pub use claimer::Claimer;
pub use config::WorkerConfig;
pub use executor::{Executor, IsolatedExecutor};
pub use worker_loop::{setup_signal_handler, Iteration, WorkerLoop};
