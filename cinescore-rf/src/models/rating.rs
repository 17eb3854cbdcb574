//! Canonical rating representation and title query
//!
//! `RatingSet` is the normalized, upstream-agnostic output of a lookup.
//! A field is present only when the upstream supplied a usable value;
//! absence means "unknown", never zero.

use serde::{Deserialize, Serialize};

/// Cache key delimiter; query fields never contain it after trimming
const KEY_DELIMITER: &str = "::";

/// IMDb rating component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImdbRating {
    /// Score on a 0.0-10.0 scale, one decimal digit as supplied upstream
    pub score: f64,
    /// Number of votes behind the score; absent when the upstream did not
    /// report one alongside the score
    #[serde(rename = "voteCount", skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<u64>,
}

/// Metacritic rating component (0-100)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetacriticRating {
    pub score: u8,
}

/// Rotten Tomatoes rating component (0-100, percent of positive reviews)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RottenTomatoesRating {
    pub score: u8,
}

/// Normalized rating set for one title
///
/// Constructed once by the fetch client's normalization step and immutable
/// thereafter; passed by value to the cache and to API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb: Option<ImdbRating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metacritic: Option<MetacriticRating>,
    #[serde(rename = "rottenTomatoes", skip_serializing_if = "Option::is_none")]
    pub rotten_tomatoes: Option<RottenTomatoesRating>,
}

impl RatingSet {
    /// True when no source supplied any rating
    pub fn is_empty(&self) -> bool {
        self.imdb.is_none() && self.metacritic.is_none() && self.rotten_tomatoes.is_none()
    }
}

/// Media type hint passed through to the upstream query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Series,
    Episode,
}

impl MediaType {
    /// Upstream query-parameter value
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "series",
            MediaType::Episode => "episode",
        }
    }
}

/// One title lookup request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleQuery {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(rename = "mediaType", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
}

impl TitleQuery {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            year: None,
            media_type: None,
        }
    }

    /// Title with surrounding whitespace removed
    pub fn trimmed_title(&self) -> &str {
        self.title.trim()
    }

    /// A query is usable iff the trimmed title is non-empty
    pub fn is_valid(&self) -> bool {
        !self.trimmed_title().is_empty()
    }

    /// Deterministic cache key: trimmed title, then year and media type
    /// appended only when present. The same logical query always produces
    /// the same key, for both reads and writes.
    pub fn cache_key(&self) -> String {
        let mut key = self.trimmed_title().to_string();
        if let Some(year) = self.year {
            key.push_str(KEY_DELIMITER);
            key.push_str(&year.to_string());
        }
        if let Some(media_type) = self.media_type {
            key.push_str(KEY_DELIMITER);
            key.push_str(media_type.as_str());
        }
        key
    }
}
