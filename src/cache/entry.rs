//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// Longest lifetime an entry can be given (100 years); larger TTLs are clamped.
pub const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

// == Cache Entry ==
/// A cached payload and the instant it stops being served.
///
/// Entries are never mutated in place; a refresh replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl_seconds` after `now`.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl_seconds` - Lifetime in seconds
    /// * `now` - Current time from the store's clock
    pub fn new(value: Value, ttl_seconds: u64, now: DateTime<Utc>) -> Self {
        let ttl = Duration::seconds(ttl_seconds.min(MAX_TTL_SECONDS) as i64);
        let expires_at = now + ttl;

        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once `now >= expires_at`, so a zero TTL is never served.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining TTL in seconds, zero once expired.
    pub fn ttl_remaining(&self, now: DateTime<Utc>) -> u64 {
        let remaining = self.expires_at - now;
        u64::try_from(remaining.num_seconds()).unwrap_or(0)
    }
}
