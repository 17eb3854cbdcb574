//! OMDb API client
//!
//! Resolves one title query against OMDb with bounded retries and
//! normalizes the heterogeneous upstream payload into the canonical
//! [`RatingSet`]. Transport failures (timeouts, refused connections,
//! non-success HTTP status) are retried with exponential backoff; failures
//! the upstream itself reports (`Response: "False"`) are classified and
//! never retried.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{
    ImdbRating, MetacriticRating, RatingSet, RottenTomatoesRating, TitleQuery,
};

const OMDB_BASE_URL: &str = "https://www.omdbapi.com/";
const USER_AGENT: &str = "cinescore/0.1.0 (https://github.com/cinescore/cinescore)";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Total attempts per fetch, including the first
pub const MAX_ATTEMPTS: u32 = 3;

/// Backoff unit; retry N sleeps `2^(N-1)` units
const BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// OMDb's explicit "not applicable" sentinel; always maps to absent
const NOT_APPLICABLE: &str = "N/A";

/// Source label of the tertiary score inside the Ratings list
const ROTTEN_TOMATOES_SOURCE: &str = "Rotten Tomatoes";

/// Classified fetch failures
///
/// Only `TransientUpstream` is produced after retrying; the rest fail
/// immediately because retrying cannot change the outcome.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Caller supplied an empty title; no network attempt is made
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Transport failures persisted through the retry budget
    #[error("Upstream unavailable: {0}")]
    TransientUpstream(String),

    /// Upstream affirmatively reports the title does not exist
    #[error("Title not found: {0}")]
    NotFound(String),

    /// Upstream rejects the API key
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Generic upstream-reported failure
    #[error("Upstream rejected request: {0}")]
    UpstreamRejected(String),
}

impl FetchError {
    /// Stable reason code for the wire shape
    pub fn reason_code(&self) -> &'static str {
        match self {
            FetchError::InvalidQuery(_) => "INVALID_QUERY",
            FetchError::TransientUpstream(_) => "TRANSIENT_UPSTREAM",
            FetchError::NotFound(_) => "NOT_FOUND",
            FetchError::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            FetchError::UpstreamRejected(_) => "UPSTREAM_REJECTED",
        }
    }
}

/// Transport-level failure (timeout, refused connection, non-2xx status)
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Raw OMDb response shape
///
/// Fields are sometimes present, sometimes `"N/A"`, and the Rotten
/// Tomatoes score only appears inside the heterogeneous `Ratings` list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OmdbPayload {
    /// Upstream's own success indicator: "True" or "False"
    #[serde(rename = "Response")]
    pub response: String,
    /// Failure message when `Response` is "False"
    #[serde(rename = "Error")]
    pub error: Option<String>,
    /// Primary score, "0.0"-"10.0" with one decimal, or "N/A"
    #[serde(rename = "imdbRating")]
    pub imdb_rating: Option<String>,
    /// Vote count with thousands separators, e.g. "2,541,036", or "N/A"
    #[serde(rename = "imdbVotes")]
    pub imdb_votes: Option<String>,
    /// Secondary score "0"-"100", frequently "N/A" for episodic content
    #[serde(rename = "Metascore")]
    pub metascore: Option<String>,
    /// Per-source rating list; Rotten Tomatoes appears here as "89%"
    #[serde(rename = "Ratings")]
    pub ratings: Option<Vec<OmdbSourceRating>>,
}

/// One element of the per-source ratings list
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OmdbSourceRating {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Value")]
    pub value: String,
}

/// Upstream request port
///
/// Production uses [`HttpTransport`]; tests inject stubs that count
/// attempts and return canned payloads.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn send(&self, query: &TitleQuery) -> std::result::Result<OmdbPayload, TransportError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    http_client: reqwest::Client,
    api_key: String,
}

impl HttpTransport {
    pub fn new(api_key: String) -> std::result::Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
        })
    }
}

#[async_trait]
impl UpstreamTransport for HttpTransport {
    async fn send(&self, query: &TitleQuery) -> std::result::Result<OmdbPayload, TransportError> {
        // Deterministic request: optional parameters appear only when the
        // query supplies them, so identical logical queries always produce
        // identical requests.
        let mut params: Vec<(&str, String)> = vec![
            ("apikey", self.api_key.clone()),
            ("t", query.trimmed_title().to_string()),
        ];
        if let Some(year) = query.year {
            params.push(("y", year.to_string()));
        }
        if let Some(media_type) = query.media_type {
            params.push(("type", media_type.as_str().to_string()));
        }

        debug!(title = %query.trimmed_title(), "Querying OMDb API");

        let response = self
            .http_client
            .get(OMDB_BASE_URL)
            .query(&params)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError(format!("HTTP status {}", status.as_u16())));
        }

        response
            .json::<OmdbPayload>()
            .await
            .map_err(|e| TransportError(format!("Malformed response body: {}", e)))
    }
}

/// OMDb fetch client with bounded retries
///
/// Stateless besides the transport handle; safe to reuse concurrently.
pub struct OmdbClient {
    transport: Arc<dyn UpstreamTransport>,
    backoff_unit: Duration,
}

impl OmdbClient {
    pub fn new(api_key: String) -> std::result::Result<Self, TransportError> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(api_key)?)))
    }

    pub fn with_transport(transport: Arc<dyn UpstreamTransport>) -> Self {
        Self {
            transport,
            backoff_unit: BACKOFF_UNIT,
        }
    }

    /// Override the backoff unit; tests inject zero to avoid real timers
    pub fn with_backoff_unit(mut self, backoff_unit: Duration) -> Self {
        self.backoff_unit = backoff_unit;
        self
    }

    /// Resolve one title query to a normalized rating set
    pub async fn fetch(&self, query: &TitleQuery) -> std::result::Result<RatingSet, FetchError> {
        if !query.is_valid() {
            return Err(FetchError::InvalidQuery(
                "Title must be non-empty".to_string(),
            ));
        }

        let mut last_error: Option<TransportError> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                // Retry N waits 2^(N-1) backoff units: 1 unit, then 2
                let delay = self.backoff_unit * 2u32.pow(attempt - 2);
                debug!(
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying upstream fetch"
                );
                tokio::time::sleep(delay).await;
            }

            match self.transport.send(query).await {
                Ok(payload) => return interpret_payload(query, payload),
                Err(e) => {
                    warn!(
                        title = %query.trimmed_title(),
                        attempt = attempt,
                        "Upstream transport failure: {}",
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown transport failure".to_string());
        Err(FetchError::TransientUpstream(format!(
            "{} attempts exhausted: {}",
            MAX_ATTEMPTS, detail
        )))
    }
}

/// Inspect the upstream's own success indicator and normalize on success
fn interpret_payload(
    query: &TitleQuery,
    payload: OmdbPayload,
) -> std::result::Result<RatingSet, FetchError> {
    if payload.response != "True" {
        let message = payload
            .error
            .unwrap_or_else(|| "Unspecified upstream failure".to_string());
        return Err(classify_upstream_error(query, message));
    }

    let ratings = normalize(&payload);
    info!(
        title = %query.trimmed_title(),
        imdb = ratings.imdb.is_some(),
        metacritic = ratings.metacritic.is_some(),
        rotten_tomatoes = ratings.rotten_tomatoes.is_some(),
        "Retrieved ratings from OMDb"
    );
    Ok(ratings)
}

/// Classify an upstream-reported failure by message content
///
/// These are definitive answers from the upstream, not transient
/// conditions, so none of them is retried.
fn classify_upstream_error(query: &TitleQuery, message: String) -> FetchError {
    let lower = message.to_lowercase();
    if lower.contains("not found") {
        FetchError::NotFound(format!("{}: {}", query.trimmed_title(), message))
    } else if lower.contains("api key") {
        FetchError::InvalidCredentials(message)
    } else {
        FetchError::UpstreamRejected(message)
    }
}

/// Single normalization boundary: raw OMDb payload to canonical RatingSet
///
/// The "N/A" sentinel (and anything unparseable) maps to absent, never to
/// zero. Deterministic: the same payload always yields the same value.
pub fn normalize(payload: &OmdbPayload) -> RatingSet {
    let imdb = parse_score_0_10(payload.imdb_rating.as_deref()).map(|score| ImdbRating {
        score,
        vote_count: parse_vote_count(payload.imdb_votes.as_deref()),
    });

    let metacritic =
        parse_score_0_100(payload.metascore.as_deref()).map(|score| MetacriticRating { score });

    let rotten_tomatoes = payload
        .ratings
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .find(|r| r.source == ROTTEN_TOMATOES_SOURCE)
        .and_then(|r| parse_percent(&r.value))
        .map(|score| RottenTomatoesRating { score });

    RatingSet {
        imdb,
        metacritic,
        rotten_tomatoes,
    }
}

fn usable(raw: Option<&str>) -> Option<&str> {
    match raw {
        Some(value) if !value.is_empty() && value != NOT_APPLICABLE => Some(value),
        _ => None,
    }
}

/// Primary score: 0.0-10.0, one decimal digit as supplied (no rounding)
fn parse_score_0_10(raw: Option<&str>) -> Option<f64> {
    let score = usable(raw)?.parse::<f64>().ok()?;
    (0.0..=10.0).contains(&score).then_some(score)
}

/// Secondary score: integer 0-100
fn parse_score_0_100(raw: Option<&str>) -> Option<u8> {
    let score = usable(raw)?.parse::<u8>().ok()?;
    (score <= 100).then_some(score)
}

/// Vote counts arrive with thousands separators, e.g. "2,541,036"
fn parse_vote_count(raw: Option<&str>) -> Option<u64> {
    usable(raw)?.replace(',', "").parse::<u64>().ok()
}

/// Tertiary score: integer percentage, trailing '%' stripped if present
fn parse_percent(raw: &str) -> Option<u8> {
    let score = usable(Some(raw))?
        .trim_end_matches('%')
        .parse::<u8>()
        .ok()?;
    (score <= 100).then_some(score)
}

// ============================================================================
// Tests
// ============================================================================
