//! Lookup orchestration: cache-check, fetch-on-miss, cache-write
//!
//! The resolver never mutates cache internals directly, only through the
//! store's public operations, and it never caches failures: a transient
//! failure now must not poison future lookups once the condition clears.
//!
//! There is no per-key single-flight. Two concurrent lookups for the same
//! uncached key will both miss and both fetch; the upstream call is
//! idempotent and the second cache write overwrites the first with an
//! equivalent value.

use std::sync::Arc;
use tracing::debug;

use crate::models::{RatingSet, TitleQuery};
use crate::services::cache_store::CacheStore;
use crate::services::omdb_client::{FetchError, OmdbClient};

/// One successful lookup, with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct RatingLookup {
    pub ratings: RatingSet,
    pub from_cache: bool,
}

/// Sequences cache-check, fetch-on-miss, and cache-write for one query
pub struct RatingResolver {
    cache: Arc<CacheStore>,
    client: Arc<OmdbClient>,
}

impl RatingResolver {
    pub fn new(cache: Arc<CacheStore>, client: Arc<OmdbClient>) -> Self {
        Self { cache, client }
    }

    /// Resolve one title query
    ///
    /// Fast path: a valid cache entry returns immediately without touching
    /// the network. On a miss the fetch client's classified failures
    /// propagate unchanged.
    pub async fn lookup(&self, query: &TitleQuery) -> Result<RatingLookup, FetchError> {
        if !query.is_valid() {
            return Err(FetchError::InvalidQuery(
                "Title must be non-empty".to_string(),
            ));
        }

        let key = query.cache_key();

        if let Some(ratings) = self.cache.get(&key).await {
            debug!(key = %key, "Lookup served from cache");
            return Ok(RatingLookup {
                ratings,
                from_cache: true,
            });
        }

        let ratings = self.client.fetch(query).await?;

        self.cache.set(&key, ratings.clone()).await;
        debug!(key = %key, "Lookup fetched from upstream and cached");

        Ok(RatingLookup {
            ratings,
            from_cache: false,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
