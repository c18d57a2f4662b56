//! Database access for the bulk loader
//!
//! Workers never touch the database; they go through the store API. Only the
//! scheduler appends rows to the table behind that API.

pub mod connection;
pub mod robotasks;

pub use connection::{create_pool, create_pool_from_env, DbPool, DEFAULT_DATABASE_URL};
