//! cinescore-rf library interface
//!
//! Rating Fetch service: resolves media-title queries to normalized rating
//! sets through a dual-tier TTL cache and a retrying OMDb client. Exposed
//! as a library so integration tests can drive the router directly.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::{CacheStore, RatingResolver};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (settings + durable cache tier)
    pub db: SqlitePool,
    /// Dual-tier rating cache
    pub cache: Arc<CacheStore>,
    /// Lookup orchestrator
    pub resolver: Arc<RatingResolver>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, cache: Arc<CacheStore>, resolver: Arc<RatingResolver>) -> Self {
        Self {
            db,
            cache,
            resolver,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// CORS is permissive: the expected collaborator is a browser overlay
/// running on a third-party origin.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::rating_routes())
        .merge(api::cache_routes())
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
