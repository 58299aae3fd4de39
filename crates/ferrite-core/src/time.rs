//! Wall-clock helpers.
//!
//! Deadlines are absolute Unix seconds because that is what travels on the
//! wire and sits in the TTL index; 0 is the "no expiry" sentinel.

use std::time::{SystemTime, UNIX_EPOCH};

/// Sentinel deadline meaning "no expiry".
pub const NO_EXPIRY: i64 = 0;

/// Returns the current Unix time in whole seconds.
pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Converts a TTL in seconds to an absolute deadline; a TTL of 0 means no
/// expiry.
pub fn deadline(now: i64, ttl: u32) -> i64 {
    if ttl > 0 {
        now + i64::from(ttl)
    } else {
        NO_EXPIRY
    }
}
