//! Cache Statistics Module
//!
//! Counters for both tiers and the compute path.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time view of cache behaviour.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Reads answered by the local tier
    pub l1_hits: u64,
    /// Reads answered by the durable tier (and promoted)
    pub l2_hits: u64,
    /// Reads that missed both tiers
    pub misses: u64,
    /// Compute invocations
    pub computes: u64,
    /// Compute invocations that failed or timed out
    pub compute_failures: u64,
    /// Failed computes answered with an expired value
    pub stale_served: u64,
    /// Callers that waited on another caller's compute
    pub coalesced: u64,
    /// Local entries evicted by capacity
    pub evictions: u64,
    /// Local entries currently held
    pub local_entries: usize,
}

impl CacheStats {
    /// Fraction of reads answered by either tier.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.l1_hits + self.l2_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

// == Accessor Counters ==
/// Lock-free counters updated on the accessor's hot path.
#[derive(Debug, Default)]
pub struct AccessorCounters {
    l1_hits: AtomicU64,
    l2_hits: AtomicU64,
    misses: AtomicU64,
    computes: AtomicU64,
    compute_failures: AtomicU64,
    stale_served: AtomicU64,
    coalesced: AtomicU64,
}

impl AccessorCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_l1_hit(&self) {
        self.l1_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_l2_hit(&self) {
        self.l2_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_compute(&self) {
        self.computes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_compute_failure(&self) {
        self.compute_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_served(&self) {
        self.stale_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot combined with the local tier's own counters.
    pub fn snapshot(&self, evictions: u64, local_entries: usize) -> CacheStats {
        CacheStats {
            l1_hits: self.l1_hits.load(Ordering::Relaxed),
            l2_hits: self.l2_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computes: self.computes.load(Ordering::Relaxed),
            compute_failures: self.compute_failures.load(Ordering::Relaxed),
            stale_served: self.stale_served.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            evictions,
            local_entries,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_counts_both_tiers() {
        let stats = CacheStats {
            l1_hits: 6,
            l2_hits: 2,
            misses: 2,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_hit_rate_zero_requests() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_counters_snapshot() {
        let counters = AccessorCounters::new();
        counters.record_l1_hit();
        counters.record_l2_hit();
        counters.record_miss();
        counters.record_compute();
        counters.record_compute_failure();
        counters.record_stale_served();
        counters.record_coalesced();

        let stats = counters.snapshot(3, 7);
        assert_eq!(stats.l1_hits, 1);
        assert_eq!(stats.l2_hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.computes, 1);
        assert_eq!(stats.compute_failures, 1);
        assert_eq!(stats.stale_served, 1);
        assert_eq!(stats.coalesced, 1);
        assert_eq!(stats.evictions, 3);
        assert_eq!(stats.local_entries, 7);
    }
}
