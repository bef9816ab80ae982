//! Tier Contract
//!
//! The shape shared by the local and durable tiers, and the TTL pair every
//! cached key is configured with.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CacheError, Result};

/// A key/value tier with per-entry expiry.
///
/// Values are opaque serialized bytes. `put` overwrites unconditionally.
/// `get` answers only fresh entries; `get_stale` ignores expiry and answers
/// whatever was last written, if the tier still holds it.
///
/// Read failures never surface: an unreachable medium reads as a miss.
#[async_trait]
pub trait TierStore: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    async fn get_stale(&self, key: &str) -> Option<Vec<u8>>;

    /// Releases connections held by the tier. Called once at shutdown.
    async fn close(&self) {}
}

// == Tier TTL ==
/// Freshness windows for one key: `l1` for the in-process copy, `l2` for
/// the shared copy. `l1 <= l2` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierTtl {
    l1: Duration,
    l2: Duration,
}

impl TierTtl {
    pub fn new(l1: Duration, l2: Duration) -> Result<Self> {
        if l2.is_zero() {
            return Err(CacheError::Configuration(
                "L2 TTL must be greater than zero".to_string(),
            ));
        }
        if l1 > l2 {
            return Err(CacheError::Configuration(format!(
                "L1 TTL ({}ms) exceeds L2 TTL ({}ms)",
                l1.as_millis(),
                l2.as_millis()
            )));
        }
        Ok(Self { l1, l2 })
    }

    pub fn from_secs(l1: u64, l2: u64) -> Result<Self> {
        Self::new(Duration::from_secs(l1), Duration::from_secs(l2))
    }

    pub fn l1(&self) -> Duration {
        self.l1
    }

    pub fn l2(&self) -> Duration {
        self.l2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_pair() {
        let ttl = TierTtl::from_secs(5, 30).unwrap();
        assert_eq!(ttl.l1(), Duration::from_secs(5));
        assert_eq!(ttl.l2(), Duration::from_secs(30));
    }

    #[test]
    fn test_equal_pair_is_allowed() {
        assert!(TierTtl::from_secs(30, 30).is_ok());
    }

    #[test]
    fn test_l1_longer_than_l2_is_rejected() {
        let result = TierTtl::from_secs(60, 30);
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[test]
    fn test_zero_l2_is_rejected() {
        let result = TierTtl::from_secs(0, 0);
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }
}
