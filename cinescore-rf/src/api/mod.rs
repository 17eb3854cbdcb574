//! HTTP API handlers for cinescore-rf

pub mod cache;
pub mod health;
pub mod ratings;
pub mod settings;

pub use cache::cache_routes;
pub use health::health_routes;
pub use ratings::rating_routes;
pub use settings::settings_routes;
