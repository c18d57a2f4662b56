//! Database connection management

use crate::error::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Type alias for the database pool
pub type DbPool = PgPool;

/// Local socket connection used when DATABASE_URL is not set
pub const DEFAULT_DATABASE_URL: &str = "postgres://postgres@/postgres";

/// Create a new database connection pool
///
/// # Arguments
/// * `database_url` - PostgreSQL connection string
///
/// # Example
/// ```ignore
/// let pool = create_pool(DEFAULT_DATABASE_URL).await?;
/// ```
pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(30))
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Create a pool from the DATABASE_URL environment variable, falling back to
/// the local postgres socket
pub async fn create_pool_from_env() -> Result<DbPool> {
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    create_pool(&database_url).await
}
