//! Settings database operations
//!
//! Provides get/set accessors for the settings table following the
//! key-value pattern. The cache duration and the OMDb API key live here.

use cinescore_common::{Error, Result};
use sqlx::{Pool, Sqlite};

#[cfg(test)]
use sqlx::SqlitePool;

/// Settings key for the cache entry lifetime in hours
pub const CACHE_DURATION_KEY: &str = "cache_duration_hours";

/// Settings key for the OMDb API key
pub const OMDB_API_KEY_KEY: &str = "omdb_api_key";

/// Default cache entry lifetime when nothing is persisted yet
pub const DEFAULT_CACHE_DURATION_HOURS: u64 = 24;

/// Get cache duration in hours from database
///
/// **Returns:** persisted value, or the 24h default if not set
pub async fn get_cache_duration_hours(db: &Pool<Sqlite>) -> Result<u64> {
    get_setting(db, CACHE_DURATION_KEY)
        .await
        .map(|opt| opt.unwrap_or(DEFAULT_CACHE_DURATION_HOURS))
}

/// Set cache duration in hours in database
///
/// Rejects zero; callers validate positivity before the value is
/// representable as u64.
pub async fn set_cache_duration_hours(db: &Pool<Sqlite>, hours: u64) -> Result<()> {
    if hours == 0 {
        return Err(Error::InvalidInput(
            "Cache duration must be a positive number of hours".to_string(),
        ));
    }
    set_setting(db, CACHE_DURATION_KEY, hours).await
}

/// Get OMDb API key from database
///
/// **Returns:** Some(key) if exists, None if not set
pub async fn get_omdb_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, OMDB_API_KEY_KEY).await
}

/// Set OMDb API key in database
pub async fn set_omdb_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, OMDB_API_KEY_KEY, key).await
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting failed: {}", e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
