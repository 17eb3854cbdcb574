//! Database access for cinescore-rf
//!
//! One SQLite database holds the durable cache tier (`ratings_cache`) and
//! the key-value `settings` table.

pub mod ratings;
pub mod settings;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects to cinescore.db in the data directory, creating it if missing.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create cinescore-rf tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    // Key-value settings (cache duration, OMDb API key)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Durable cache tier: one row per cache key, JSON payload plus the
    // write timestamp in epoch milliseconds
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ratings_cache (
            key TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            timestamp INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ratings_cache_timestamp ON ratings_cache(timestamp)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
