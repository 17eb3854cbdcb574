//! Rating lookup endpoint
//!
//! One logical operation for the overlay collaborator: resolve a title
//! query to a normalized rating set. Classified upstream failures are part
//! of the response envelope, not HTTP errors — the collaborator renders
//! "ratings unavailable" from `success: false` and may retry
//! `TRANSIENT_UPSTREAM` later at its own discretion.

use axum::{extract::Query, extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{MediaType, RatingSet, TitleQuery};
use crate::{ApiError, ApiResult, AppState};

/// Query parameters for GET /api/ratings
#[derive(Debug, Deserialize)]
pub struct LookupParams {
    pub title: String,
    pub year: Option<u16>,
    /// "movie", "series" or "episode"
    pub media_type: Option<String>,
}

/// Response envelope for a lookup
#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings: Option<RatingSet>,
    #[serde(rename = "fromCache", skip_serializing_if = "Option::is_none")]
    pub from_cache: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// GET /api/ratings?title=...&year=...&media_type=...
pub async fn lookup_ratings(
    State(state): State<AppState>,
    Query(params): Query<LookupParams>,
) -> ApiResult<Json<LookupResponse>> {
    let media_type = match params.media_type.as_deref() {
        None => None,
        Some("movie") => Some(MediaType::Movie),
        Some("series") => Some(MediaType::Series),
        Some("episode") => Some(MediaType::Episode),
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "Unknown media_type: {}",
                other
            )))
        }
    };

    let query = TitleQuery {
        title: params.title,
        year: params.year,
        media_type,
    };

    match state.resolver.lookup(&query).await {
        Ok(lookup) => Ok(Json(LookupResponse {
            success: true,
            ratings: Some(lookup.ratings),
            from_cache: Some(lookup.from_cache),
            reason: None,
            message: None,
        })),
        Err(e) => {
            debug!(title = %query.trimmed_title(), reason = e.reason_code(), "Lookup failed");
            Ok(Json(LookupResponse {
                success: false,
                ratings: None,
                from_cache: None,
                reason: Some(e.reason_code()),
                message: Some(e.to_string()),
            }))
        }
    }
}

/// Build rating lookup routes
pub fn rating_routes() -> Router<AppState> {
    Router::new().route("/api/ratings", get(lookup_ratings))
}
