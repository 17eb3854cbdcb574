//! cinescore-rf - Rating Fetch Service
//!
//! Resolves media-title lookups against OMDb, caches the normalized rating
//! sets in a dual-tier TTL cache (in-process map + SQLite), and serves them
//! over HTTP to the page-overlay collaborator.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use cinescore_rf::services::{CacheStore, OmdbClient, RatingResolver, SqliteTier};
use cinescore_rf::AppState;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5731";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting cinescore-rf (Rating Fetch) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Resolve data directory (env -> TOML -> OS default)
    let data_dir = cinescore_common::config::resolve_data_dir("CINESCORE_DATA");
    let db_path = data_dir.join("cinescore.db");
    info!("Database: {}", db_path.display());

    // Step 2: Open or create database
    let db_pool = cinescore_rf::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Step 3: Cache store over the dual tiers
    let cache = Arc::new(CacheStore::init(Arc::new(SqliteTier::new(db_pool.clone()))).await);
    info!("Cache initialized ({}h duration)", cache.duration_hours());

    // Step 4: Resolve the OMDb API key (database -> env -> TOML)
    let toml_config = cinescore_common::config::load_toml_config().unwrap_or_else(|e| {
        warn!("No TOML config loaded: {}", e);
        Default::default()
    });
    let api_key = cinescore_rf::config::resolve_omdb_api_key(&db_pool, &toml_config).await?;

    // Step 5: Fetch client and orchestrator
    let client = Arc::new(
        OmdbClient::new(api_key).map_err(|e| anyhow::anyhow!("HTTP client init failed: {}", e))?,
    );
    let resolver = Arc::new(RatingResolver::new(cache.clone(), client));

    // Hourly expiration sweep alongside the lazy expiry-on-read
    let sweeper_cache = cache.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        interval.tick().await; // first tick completes immediately
        loop {
            interval.tick().await;
            let removed = sweeper_cache.cleanup_expired().await;
            if removed > 0 {
                info!(removed = removed, "Scheduled cache sweep");
            }
        }
    });

    // Create application state and router
    let state = AppState::new(db_pool, cache, resolver);
    let app = cinescore_rf::build_router(state);

    // Start server
    let bind_addr = toml_config
        .bind_addr
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
