//! Durable cache tier row operations
//!
//! The `ratings_cache` table is a key-value map: one row per cache key,
//! the normalized rating set as JSON text, and the write timestamp in
//! epoch milliseconds. The cache store coordinates this tier with the
//! in-memory one; nothing else touches the table.

use cinescore_common::{Error, Result};
use sqlx::{Pool, Sqlite};

/// One raw durable-tier row: (JSON payload, stored-at epoch millis)
pub type RawEntry = (String, i64);

/// Fetch one entry by key
pub async fn get_entry(db: &Pool<Sqlite>, key: &str) -> Result<Option<RawEntry>> {
    let row: Option<(String, i64)> =
        sqlx::query_as("SELECT data, timestamp FROM ratings_cache WHERE key = ?")
            .bind(key)
            .fetch_optional(db)
            .await
            .map_err(Error::Database)?;

    Ok(row)
}

/// Insert or overwrite one entry
pub async fn upsert_entry(db: &Pool<Sqlite>, key: &str, data: &str, timestamp: i64) -> Result<()> {
    sqlx::query(
        "INSERT INTO ratings_cache (key, data, timestamp) VALUES (?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET data = excluded.data, timestamp = excluded.timestamp",
    )
    .bind(key)
    .bind(data)
    .bind(timestamp)
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

/// Delete one entry by key
pub async fn delete_entry(db: &Pool<Sqlite>, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM ratings_cache WHERE key = ?")
        .bind(key)
        .execute(db)
        .await
        .map_err(Error::Database)?;

    Ok(())
}

/// Number of entries currently persisted
pub async fn count_entries(db: &Pool<Sqlite>) -> Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings_cache")
        .fetch_one(db)
        .await
        .map_err(Error::Database)?;

    Ok(count.max(0) as u64)
}

/// Approximate persisted size: key plus JSON payload bytes per row
pub async fn size_estimate_bytes(db: &Pool<Sqlite>) -> Result<u64> {
    let size: Option<i64> =
        sqlx::query_scalar("SELECT SUM(LENGTH(key) + LENGTH(data)) FROM ratings_cache")
            .fetch_one(db)
            .await
            .map_err(Error::Database)?;

    Ok(size.unwrap_or(0).max(0) as u64)
}

/// Delete the `limit` oldest entries by timestamp ascending
///
/// Returns the keys removed so the in-memory tier can be kept consistent.
pub async fn evict_oldest(db: &Pool<Sqlite>, limit: u64) -> Result<Vec<String>> {
    let keys: Vec<(String,)> =
        sqlx::query_as("SELECT key FROM ratings_cache ORDER BY timestamp ASC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(db)
            .await
            .map_err(Error::Database)?;

    sqlx::query(
        "DELETE FROM ratings_cache WHERE key IN
         (SELECT key FROM ratings_cache ORDER BY timestamp ASC LIMIT ?)",
    )
    .bind(limit as i64)
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(keys.into_iter().map(|(k,)| k).collect())
}

/// Delete every entry stored strictly before `cutoff_millis`; returns count.
/// Entries stamped exactly at the cutoff are still fresh and kept.
pub async fn delete_older_than(db: &Pool<Sqlite>, cutoff_millis: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM ratings_cache WHERE timestamp < ?")
        .bind(cutoff_millis)
        .execute(db)
        .await
        .map_err(Error::Database)?;

    Ok(result.rows_affected())
}

/// Delete everything; returns count removed
pub async fn clear_all(db: &Pool<Sqlite>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM ratings_cache")
        .execute(db)
        .await
        .map_err(Error::Database)?;

    Ok(result.rows_affected())
}

// ============================================================================
// Tests
// ============================================================================
