//! Wall-clock helpers.
//!
//! Scheduled instants are absolute milliseconds since the Unix epoch so they
//! can be produced by callers without sharing a monotonic clock with the pool.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current time in milliseconds since the Unix epoch.
///
/// A clock set before the epoch reads as `0`.
#[must_use]
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Absolute instant `delay` from now, in milliseconds since the Unix epoch.
#[must_use]
pub fn ms_from_now(delay: Duration) -> u128 {
    now_ms().saturating_add(delay.as_millis())
}
