//! Cache maintenance endpoints
//!
//! Clear, statistics, and an explicit expiration sweep for a settings-style
//! collaborator. All three are best-effort: durable-tier trouble degrades
//! the numbers, never the response.

use axum::{extract::State, routing::get, routing::post, Json, Router};
use serde::Serialize;
use tracing::info;

use crate::services::CacheStats;
use crate::AppState;

/// Response payload for clear and cleanup
#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    #[serde(rename = "removedCount")]
    pub removed_count: u64,
}

/// POST /api/cache/clear
pub async fn clear_cache(State(state): State<AppState>) -> Json<RemovedResponse> {
    let removed_count = state.cache.clear().await;
    info!(removed = removed_count, "Cache cleared");
    Json(RemovedResponse { removed_count })
}

/// GET /api/cache/stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}

/// POST /api/cache/cleanup
///
/// Explicit expiration sweep, usable on a schedule.
pub async fn cleanup_expired(State(state): State<AppState>) -> Json<RemovedResponse> {
    let removed_count = state.cache.cleanup_expired().await;
    info!(removed = removed_count, "Expired cache entries swept");
    Json(RemovedResponse { removed_count })
}

/// Build cache maintenance routes
pub fn cache_routes() -> Router<AppState> {
    Router::new()
        .route("/api/cache/clear", post(clear_cache))
        .route("/api/cache/stats", get(cache_stats))
        .route("/api/cache/cleanup", post(cleanup_expired))
}
