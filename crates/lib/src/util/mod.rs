//! Shared utilities.
//!
//! Hashing, identifier validation, atomic JSON persistence and test helpers.

pub mod fsio;
pub mod hash;
pub mod validate;

#[cfg(test)]
pub mod testutil;

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch; zero if the clock is before it.
pub fn unix_now() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_secs()
}
