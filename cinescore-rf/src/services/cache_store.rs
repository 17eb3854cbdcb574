//! Dual-tier TTL cache for normalized rating sets
//!
//! Two tiers: an in-process map (ephemeral, lost on restart) and a SQLite
//! key-value table (durable, survives restarts) behind the [`DurableTier`]
//! port. The store coordinates them with one policy: durable-tier failure
//! never surfaces to the caller, it degrades the operation to memory-only
//! and logs a warning.
//!
//! Expiration is evaluated at read time against the duration currently
//! configured, not the duration in effect when an entry was written.
//! Lowering the duration can retroactively expire older entries; raising
//! it can resurrect entries that would have expired under the old setting.

use async_trait::async_trait;
use cinescore_common::time::{hours_to_millis, now_millis};
use cinescore_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::db;
use crate::db::ratings::RawEntry;
use crate::db::settings::DEFAULT_CACHE_DURATION_HOURS;
use crate::models::RatingSet;

/// Hard cap on durable-tier entries
pub const MAX_DURABLE_ENTRIES: u64 = 500;

/// Entries removed in one batch when the cap is hit (oldest half)
pub const EVICTION_BATCH: u64 = MAX_DURABLE_ENTRIES / 2;

/// One cached rating set with its write timestamp
///
/// `stored_at` is set exactly once, at write time, and never refreshed on
/// reads (no sliding expiration).
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: RatingSet,
    pub stored_at: i64,
}

/// Best-effort cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    #[serde(rename = "totalItems")]
    pub total_items: u64,
    #[serde(rename = "sizeEstimateBytes")]
    pub size_estimate_bytes: u64,
    #[serde(rename = "durationHours")]
    pub duration_hours: u64,
}

/// Durable key-value port behind the cache store
///
/// Production uses [`SqliteTier`]; tests inject failing implementations to
/// exercise the degraded-but-available path.
#[async_trait]
pub trait DurableTier: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<RawEntry>>;
    async fn put(&self, key: &str, data: &str, timestamp: i64) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn count(&self) -> Result<u64>;
    async fn size_estimate(&self) -> Result<u64>;
    /// Remove the `limit` oldest entries; returns the removed keys
    async fn evict_oldest(&self, limit: u64) -> Result<Vec<String>>;
    /// Remove entries stored before `cutoff_millis`; returns count
    async fn delete_older_than(&self, cutoff_millis: i64) -> Result<u64>;
    async fn clear(&self) -> Result<u64>;
    async fn load_duration_hours(&self) -> Result<u64>;
    async fn store_duration_hours(&self, hours: u64) -> Result<()>;
}

/// SQLite-backed durable tier over the shared connection pool
pub struct SqliteTier {
    pool: SqlitePool,
}

impl SqliteTier {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DurableTier for SqliteTier {
    async fn get(&self, key: &str) -> Result<Option<RawEntry>> {
        db::ratings::get_entry(&self.pool, key).await
    }

    async fn put(&self, key: &str, data: &str, timestamp: i64) -> Result<()> {
        db::ratings::upsert_entry(&self.pool, key, data, timestamp).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        db::ratings::delete_entry(&self.pool, key).await
    }

    async fn count(&self) -> Result<u64> {
        db::ratings::count_entries(&self.pool).await
    }

    async fn size_estimate(&self) -> Result<u64> {
        db::ratings::size_estimate_bytes(&self.pool).await
    }

    async fn evict_oldest(&self, limit: u64) -> Result<Vec<String>> {
        db::ratings::evict_oldest(&self.pool, limit).await
    }

    async fn delete_older_than(&self, cutoff_millis: i64) -> Result<u64> {
        db::ratings::delete_older_than(&self.pool, cutoff_millis).await
    }

    async fn clear(&self) -> Result<u64> {
        db::ratings::clear_all(&self.pool).await
    }

    async fn load_duration_hours(&self) -> Result<u64> {
        db::settings::get_cache_duration_hours(&self.pool).await
    }

    async fn store_duration_hours(&self, hours: u64) -> Result<()> {
        db::settings::set_cache_duration_hours(&self.pool, hours).await
    }
}

/// Dual-tier TTL cache
pub struct CacheStore {
    durable: Arc<dyn DurableTier>,
    memory: RwLock<HashMap<String, CacheEntry>>,
    duration_hours: AtomicU64,
}

impl CacheStore {
    /// Create a store, loading the persisted cache duration
    ///
    /// A durable-tier failure here degrades to the 24h default.
    pub async fn init(durable: Arc<dyn DurableTier>) -> Self {
        let duration_hours = match durable.load_duration_hours().await {
            Ok(hours) => hours,
            Err(e) => {
                warn!("Failed to load cache duration, using default: {}", e);
                DEFAULT_CACHE_DURATION_HOURS
            }
        };

        Self {
            durable,
            memory: RwLock::new(HashMap::new()),
            duration_hours: AtomicU64::new(duration_hours),
        }
    }

    /// Current cache duration in hours
    pub fn duration_hours(&self) -> u64 {
        self.duration_hours.load(Ordering::Relaxed)
    }

    /// Update the cache duration; affects all subsequent expiration checks
    /// immediately. Rejects zero.
    pub async fn set_duration_hours(&self, hours: u64) -> Result<()> {
        if hours == 0 {
            return Err(Error::InvalidInput(
                "Cache duration must be a positive number of hours".to_string(),
            ));
        }

        self.duration_hours.store(hours, Ordering::Relaxed);

        // Write-through; persistence failure leaves the in-memory value live
        if let Err(e) = self.durable.store_duration_hours(hours).await {
            warn!("Failed to persist cache duration: {}", e);
        }

        Ok(())
    }

    /// Entry freshness under the duration in effect right now
    fn is_fresh(&self, stored_at: i64, now: i64) -> bool {
        now - stored_at <= hours_to_millis(self.duration_hours())
    }

    /// Read one entry
    ///
    /// Durable tier first; a stale entry is lazily deleted from both tiers
    /// and reported absent. A row that no longer deserializes is treated as
    /// a miss for that key. Durable-tier failure falls back to the memory
    /// tier transparently.
    pub async fn get(&self, key: &str) -> Option<RatingSet> {
        let now = now_millis();

        match self.durable.get(key).await {
            Ok(Some((data, stored_at))) => {
                if !self.is_fresh(stored_at, now) {
                    debug!(key = %key, age_ms = now - stored_at, "Cache entry expired");
                    self.remove_both_tiers(key).await;
                    return None;
                }
                match serde_json::from_str::<RatingSet>(&data) {
                    Ok(ratings) => {
                        debug!(key = %key, age_ms = now - stored_at, "Cache hit (durable)");
                        Some(ratings)
                    }
                    Err(e) => {
                        // Unexpected shape: a miss for this key, not a failure
                        warn!(key = %key, "Corrupted cache entry, dropping: {}", e);
                        self.remove_both_tiers(key).await;
                        None
                    }
                }
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, "Durable tier unavailable, falling back to memory: {}", e);
                let mut memory = self.memory.write().await;
                match memory.get(key) {
                    Some(entry) if self.is_fresh(entry.stored_at, now) => {
                        debug!(key = %key, "Cache hit (memory fallback)");
                        Some(entry.data.clone())
                    }
                    Some(_) => {
                        memory.remove(key);
                        None
                    }
                    None => None,
                }
            }
        }
    }

    /// Write one entry
    ///
    /// Memory write is unconditional. The durable write is best-effort: if
    /// the tier is unreachable the write is dropped with a warning and the
    /// caller still succeeds. When the durable map would exceed the hard
    /// cap, the oldest half is batch-evicted first.
    pub async fn set(&self, key: &str, value: RatingSet) {
        let now = now_millis();
        let entry = CacheEntry {
            data: value.clone(),
            stored_at: now,
        };

        self.memory.write().await.insert(key.to_string(), entry);

        let data = match serde_json::to_string(&value) {
            Ok(data) => data,
            Err(e) => {
                warn!(key = %key, "Failed to serialize cache entry: {}", e);
                return;
            }
        };

        match self.durable.count().await {
            Ok(count) if count >= MAX_DURABLE_ENTRIES => {
                // Overwriting an existing key does not grow the tier, so
                // only a new key triggers eviction at the cap.
                if matches!(self.durable.get(key).await, Ok(None)) {
                    match self.durable.evict_oldest(EVICTION_BATCH).await {
                        Ok(evicted) => {
                            debug!(evicted = evicted.len(), "Batch-evicted oldest cache entries");
                            let mut memory = self.memory.write().await;
                            for evicted_key in &evicted {
                                memory.remove(evicted_key);
                            }
                        }
                        Err(e) => warn!("Cache eviction failed: {}", e),
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(key = %key, "Durable tier unavailable, memory-only write: {}", e);
                return;
            }
        }

        if let Err(e) = self.durable.put(key, &data, now).await {
            warn!(key = %key, "Durable write dropped, memory write stands: {}", e);
        }
    }

    /// Empty both tiers; returns the number of entries removed
    ///
    /// Durable-tier failure is logged but does not prevent the in-memory
    /// clear.
    pub async fn clear(&self) -> u64 {
        let mut memory = self.memory.write().await;
        let memory_count = memory.len() as u64;
        memory.clear();
        drop(memory);

        match self.durable.clear().await {
            Ok(durable_count) => durable_count.max(memory_count),
            Err(e) => {
                warn!("Durable clear failed, memory tier cleared: {}", e);
                memory_count
            }
        }
    }

    /// Best-effort statistics; zeros when the durable tier is unreachable
    pub async fn stats(&self) -> CacheStats {
        let (total_items, size_estimate_bytes) =
            match (self.durable.count().await, self.durable.size_estimate().await) {
                (Ok(count), Ok(size)) => (count, size),
                (count, size) => {
                    if let Err(e) = count.and(size) {
                        warn!("Cache stats unavailable: {}", e);
                    }
                    (0, 0)
                }
            };

        CacheStats {
            total_items,
            size_estimate_bytes,
            duration_hours: self.duration_hours(),
        }
    }

    /// Explicit expiration sweep over both tiers; returns count removed
    pub async fn cleanup_expired(&self) -> u64 {
        let now = now_millis();
        let cutoff = now - hours_to_millis(self.duration_hours());

        let mut memory = self.memory.write().await;
        let before = memory.len() as u64;
        memory.retain(|_, entry| entry.stored_at >= cutoff);
        let memory_removed = before - memory.len() as u64;
        drop(memory);

        match self.durable.delete_older_than(cutoff).await {
            Ok(durable_removed) => durable_removed.max(memory_removed),
            Err(e) => {
                warn!("Durable expiration sweep failed: {}", e);
                memory_removed
            }
        }
    }

    async fn remove_both_tiers(&self, key: &str) {
        self.memory.write().await.remove(key);
        if let Err(e) = self.durable.delete(key).await {
            warn!(key = %key, "Failed to delete stale durable entry: {}", e);
        }
    }

    /// Number of entries currently in the memory tier
    #[cfg(test)]
    async fn memory_len(&self) -> usize {
        self.memory.read().await.len()
    }

    /// Insert directly into the memory tier with an explicit timestamp
    #[cfg(test)]
    async fn insert_memory_at(&self, key: &str, value: RatingSet, stored_at: i64) {
        self.memory.write().await.insert(
            key.to_string(),
            CacheEntry {
                data: value,
                stored_at,
            },
        );
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImdbRating, MetacriticRating};

    fn sample_ratings() -> RatingSet {
        RatingSet {
            imdb: Some(ImdbRating {
                score: 9.3,
                vote_count: Some(2_541_036),
            }),
            metacritic: Some(MetacriticRating { score: 82 }),
            rotten_tomatoes: None,
        }
    }

    async fn sqlite_store() -> CacheStore {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        CacheStore::init(Arc::new(SqliteTier::new(pool))).await
    }

    /// Durable tier that fails every call
    struct FailingTier;

    #[async_trait]
    impl DurableTier for FailingTier {
        async fn get(&self, _key: &str) -> Result<Option<RawEntry>> {
            Err(Error::Internal("durable tier down".to_string()))
        }
        async fn put(&self, _key: &str, _data: &str, _timestamp: i64) -> Result<()> {
            Err(Error::Internal("durable tier down".to_string()))
        }
        async fn delete(&self, _key: &str) -> Result<()> {
            Err(Error::Internal("durable tier down".to_string()))
        }
        async fn count(&self) -> Result<u64> {
            Err(Error::Internal("durable tier down".to_string()))
        }
        async fn size_estimate(&self) -> Result<u64> {
            Err(Error::Internal("durable tier down".to_string()))
        }
        async fn evict_oldest(&self, _limit: u64) -> Result<Vec<String>> {
            Err(Error::Internal("durable tier down".to_string()))
        }
        async fn delete_older_than(&self, _cutoff_millis: i64) -> Result<u64> {
            Err(Error::Internal("durable tier down".to_string()))
        }
        async fn clear(&self) -> Result<u64> {
            Err(Error::Internal("durable tier down".to_string()))
        }
        async fn load_duration_hours(&self) -> Result<u64> {
            Err(Error::Internal("durable tier down".to_string()))
        }
        async fn store_duration_hours(&self, _hours: u64) -> Result<()> {
            Err(Error::Internal("durable tier down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_set_then_get_roundtrip() {
        let store = sqlite_store().await;

        store.set("Heat::1995", sample_ratings()).await;

        let hit = store.get("Heat::1995").await;
        assert_eq!(hit, Some(sample_ratings()));
    }

    #[tokio::test]
    async fn test_get_absent_key_is_miss() {
        let store = sqlite_store().await;
        assert_eq!(store.get("unknown").await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent_and_lazily_deleted() {
        let store = sqlite_store().await;
        let data = serde_json::to_string(&sample_ratings()).unwrap();

        // Written 25 hours ago under the default 24h duration
        let stored_at = now_millis() - hours_to_millis(25);
        store.durable.put("old", &data, stored_at).await.unwrap();

        assert_eq!(store.get("old").await, None);

        // Lazy deletion removed the stale row
        assert!(store.durable.get("old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expiration_uses_duration_at_read_time() {
        let store = sqlite_store().await;
        let data = serde_json::to_string(&sample_ratings()).unwrap();

        // Written 2 hours ago
        let stored_at = now_millis() - hours_to_millis(2);
        store.durable.put("k", &data, stored_at).await.unwrap();

        // Raising the duration keeps it alive
        store.set_duration_hours(3).await.unwrap();
        assert!(store.get("k").await.is_some());

        // Lowering the duration retroactively expires it on the next read
        store.set_duration_hours(1).await.unwrap();
        assert_eq!(store.get("k").await, None);
    }

    #[tokio::test]
    async fn test_get_does_not_refresh_stored_at() {
        let store = sqlite_store().await;
        store.set("k", sample_ratings()).await;

        let (_, before) = store.durable.get("k").await.unwrap().unwrap();
        store.get("k").await.unwrap();
        let (_, after) = store.durable.get("k").await.unwrap().unwrap();

        assert_eq!(before, after, "No sliding expiration");
    }

    #[tokio::test]
    async fn test_corrupted_entry_is_a_miss_not_a_failure() {
        let store = sqlite_store().await;

        store
            .durable
            .put("bad", "not valid json {", now_millis())
            .await
            .unwrap();

        assert_eq!(store.get("bad").await, None);
        assert!(store.durable.get("bad").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eviction_bound_holds_after_501_inserts() {
        let store = sqlite_store().await;
        let data = serde_json::to_string(&sample_ratings()).unwrap();

        // 500 entries with strictly increasing timestamps
        let base = now_millis() - 500_000;
        for i in 0..500i64 {
            store
                .durable
                .put(&format!("k{}", i), &data, base + i)
                .await
                .unwrap();
        }

        // 501st insert triggers the batch eviction before persisting
        store.set("k500", sample_ratings()).await;

        let count = store.durable.count().await.unwrap();
        assert!(count <= MAX_DURABLE_ENTRIES, "count was {}", count);
        assert_eq!(count, 251);

        // The oldest half is gone, the newest survivors remain
        assert!(store.durable.get("k0").await.unwrap().is_none());
        assert!(store.durable.get("k249").await.unwrap().is_none());
        assert!(store.durable.get("k250").await.unwrap().is_some());
        assert!(store.durable.get("k500").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overwrite_at_cap_does_not_evict() {
        let store = sqlite_store().await;
        let data = serde_json::to_string(&sample_ratings()).unwrap();

        let base = now_millis() - 500_000;
        for i in 0..500i64 {
            store
                .durable
                .put(&format!("k{}", i), &data, base + i)
                .await
                .unwrap();
        }

        // Rewriting an existing key at the cap must not shrink the tier
        store.set("k0", sample_ratings()).await;

        assert_eq!(store.durable.count().await.unwrap(), 500);
        assert!(store.durable.get("k0").await.unwrap().is_some());
        assert!(store.durable.get("k1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_degraded_storage_set_then_get_serves_from_memory() {
        let store = CacheStore::init(Arc::new(FailingTier)).await;

        store.set("k", sample_ratings()).await;
        let hit = store.get("k").await;

        assert_eq!(hit, Some(sample_ratings()));
    }

    #[tokio::test]
    async fn test_degraded_storage_memory_fallback_honors_ttl() {
        let store = CacheStore::init(Arc::new(FailingTier)).await;

        store
            .insert_memory_at("old", sample_ratings(), now_millis() - hours_to_millis(25))
            .await;

        assert_eq!(store.get("old").await, None);
        assert_eq!(store.memory_len().await, 0, "Expired entry removed");
    }

    #[tokio::test]
    async fn test_degraded_storage_stats_are_zeros() {
        let store = CacheStore::init(Arc::new(FailingTier)).await;
        store.set("k", sample_ratings()).await;

        let stats = store.stats().await;
        assert_eq!(stats.total_items, 0);
        assert_eq!(stats.size_estimate_bytes, 0);
        assert_eq!(stats.duration_hours, DEFAULT_CACHE_DURATION_HOURS);
    }

    #[tokio::test]
    async fn test_degraded_storage_clear_empties_memory() {
        let store = CacheStore::init(Arc::new(FailingTier)).await;
        store.set("a", sample_ratings()).await;
        store.set("b", sample_ratings()).await;

        let removed = store.clear().await;
        assert_eq!(removed, 2);
        assert_eq!(store.memory_len().await, 0);
    }

    #[tokio::test]
    async fn test_clear_empties_both_tiers_and_counts() {
        let store = sqlite_store().await;
        store.set("a", sample_ratings()).await;
        store.set("b", sample_ratings()).await;

        let removed = store.clear().await;
        assert_eq!(removed, 2);
        assert_eq!(store.durable.count().await.unwrap(), 0);
        assert_eq!(store.get("a").await, None);
    }

    #[tokio::test]
    async fn test_stats_reflects_durable_tier() {
        let store = sqlite_store().await;
        store.set("a", sample_ratings()).await;
        store.set("b", sample_ratings()).await;

        let stats = store.stats().await;
        assert_eq!(stats.total_items, 2);
        assert!(stats.size_estimate_bytes > 0);
        assert_eq!(stats.duration_hours, 24);
    }

    #[tokio::test]
    async fn test_cleanup_expired_sweeps_both_tiers() {
        let store = sqlite_store().await;
        let data = serde_json::to_string(&sample_ratings()).unwrap();

        let stale = now_millis() - hours_to_millis(30);
        store.durable.put("old1", &data, stale).await.unwrap();
        store.durable.put("old2", &data, stale).await.unwrap();
        store.insert_memory_at("old1", sample_ratings(), stale).await;
        store.set("fresh", sample_ratings()).await;

        let removed = store.cleanup_expired().await;
        assert_eq!(removed, 2);

        assert_eq!(store.durable.count().await.unwrap(), 1);
        assert!(store.get("fresh").await.is_some());
        assert_eq!(store.memory_len().await, 1);
    }

    #[tokio::test]
    async fn test_set_duration_rejects_zero() {
        let store = sqlite_store().await;

        let result = store.set_duration_hours(0).await;
        assert!(result.is_err());
        assert_eq!(store.duration_hours(), 24, "Stored duration unchanged");
    }

    #[tokio::test]
    async fn test_set_duration_persists_and_reloads() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();

        let store = CacheStore::init(Arc::new(SqliteTier::new(pool.clone()))).await;
        store.set_duration_hours(48).await.unwrap();
        assert_eq!(store.duration_hours(), 48);

        // A new store over the same database picks the persisted value up
        let reloaded = CacheStore::init(Arc::new(SqliteTier::new(pool))).await;
        assert_eq!(reloaded.duration_hours(), 48);
    }

    #[tokio::test]
    async fn test_duration_set_survives_degraded_persistence() {
        let store = CacheStore::init(Arc::new(FailingTier)).await;

        // Persistence fails, the in-memory value still takes effect
        store.set_duration_hours(2).await.unwrap();
        assert_eq!(store.duration_hours(), 2);
    }
}
