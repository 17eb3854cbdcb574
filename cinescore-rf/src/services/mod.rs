//! Core services for cinescore-rf

pub mod cache_store;
pub mod omdb_client;
pub mod rating_resolver;

pub use cache_store::{CacheStats, CacheStore, DurableTier, SqliteTier};
pub use omdb_client::{FetchError, HttpTransport, OmdbClient, UpstreamTransport};
pub use rating_resolver::{RatingLookup, RatingResolver};
