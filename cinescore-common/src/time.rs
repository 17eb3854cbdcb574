//! Timestamp utilities
//!
//! Cache entry ages are measured in epoch milliseconds so the durable tier
//! can store them as plain INTEGER columns.

use chrono::Utc;

/// Current wall-clock time as epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Age threshold in milliseconds for a given duration in hours
pub fn hours_to_millis(hours: u64) -> i64 {
    (hours as i64) * 3_600_000
}
