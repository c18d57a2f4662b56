//! robotask table operations

use crate::db::DbPool;
use crate::error::Result;

/// Append `urls` at `priority` in a single transaction.
///
/// Returns the number of inserted rows. Nothing is inserted if any row fails.
pub async fn insert_tasks(pool: &DbPool, urls: &[String], priority: i64) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for url in urls {
        let result = sqlx::query("INSERT INTO robotask(url, priority) VALUES ($1, $2)")
            .bind(url)
            .bind(priority)
            .execute(&mut *tx)
            .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Count tasks still waiting in the store
pub async fn count_tasks(pool: &DbPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM robotask")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
