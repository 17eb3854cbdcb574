//! # Cinescore Common Library
//!
//! Shared code for the cinescore services including:
//! - Error types
//! - Configuration loading and data directory resolution
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
