//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

// == Cache Entry ==
/// A serialized value stamped with when it was stored and for how long it
/// counts as fresh.
///
/// An expired entry is not deleted by expiry alone: tiers keep it around
/// so the accessor can fall back to it when a refresh fails.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// The key this entry was written under
    pub key: String,
    /// Serialized domain value
    pub value: Vec<u8>,
    /// Store timestamp (Unix milliseconds)
    pub stored_at: u64,
    /// Freshness window in milliseconds
    pub ttl_ms: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stored at `now_ms`.
    pub fn new(key: impl Into<String>, value: Vec<u8>, ttl: Duration, now_ms: u64) -> Self {
        Self {
            key: key.into(),
            value,
            stored_at: now_ms,
            ttl_ms: ttl.as_millis() as u64,
        }
    }

    /// Timestamp after which the entry is expired.
    pub fn expires_at(&self) -> u64 {
        self.stored_at.saturating_add(self.ttl_ms)
    }

    // == Is Expired ==
    /// An entry is expired once `now > stored_at + ttl`; at exactly the
    /// boundary it is still fresh.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at()
    }
}
