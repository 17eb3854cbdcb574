//! Settings API endpoints
//!
//! Cache duration and OMDb API key configuration for a settings-style
//! collaborator. The database is authoritative; the TOML backup for the
//! API key is best-effort.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{ApiError, ApiResult, AppState};

/// Request payload for setting the cache duration
#[derive(Debug, Deserialize)]
pub struct SetDurationRequest {
    /// New entry lifetime in hours; must be a positive integer
    pub hours: i64,
}

/// Request payload for setting the OMDb API key
#[derive(Debug, Deserialize)]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

/// Generic settings response
#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/settings/cache_duration handler
///
/// **Request:** `{"hours": 48}`
/// **Response:** `{"success": true, "message": "..."}`
///
/// **Errors:**
/// - 400 INVALID_DURATION: zero or negative hours (serde already rejects
///   non-integer values)
pub async fn set_cache_duration(
    State(state): State<AppState>,
    Json(payload): Json<SetDurationRequest>,
) -> ApiResult<Json<SettingsResponse>> {
    if payload.hours <= 0 {
        return Err(ApiError::InvalidDuration(
            "Cache duration must be a positive number of hours".to_string(),
        ));
    }

    state
        .cache
        .set_duration_hours(payload.hours as u64)
        .await
        .map_err(|e| ApiError::InvalidDuration(e.to_string()))?;

    info!(hours = payload.hours, "Cache duration updated");

    Ok(Json(SettingsResponse {
        success: true,
        message: format!("Cache duration set to {} hours", payload.hours),
    }))
}

/// POST /api/settings/omdb_api_key handler
///
/// Writes to the database (authoritative), then syncs the TOML backup
/// best-effort.
pub async fn set_omdb_api_key(
    State(state): State<AppState>,
    Json(payload): Json<SetApiKeyRequest>,
) -> ApiResult<Json<SettingsResponse>> {
    if !crate::config::is_valid_key(&payload.api_key) {
        return Err(ApiError::BadRequest(
            "API key cannot be empty or whitespace-only".to_string(),
        ));
    }

    crate::db::settings::set_omdb_api_key(&state.db, payload.api_key.clone())
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to save API key to database: {}", e)))?;

    info!("OMDb API key configured via settings API");

    match cinescore_common::config::config_file_path() {
        Ok(toml_path) => {
            if let Err(e) = crate::config::sync_api_key_to_toml(payload.api_key, &toml_path).await
            {
                warn!("TOML sync failed (database write succeeded): {}", e);
            }
        }
        Err(e) => warn!("TOML sync skipped: {}", e),
    }

    Ok(Json(SettingsResponse {
        success: true,
        message: "OMDb API key configured successfully".to_string(),
    }))
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/api/settings/cache_duration", post(set_cache_duration))
        .route("/api/settings/omdb_api_key", post(set_omdb_api_key))
}
