//! LRU Tracker Module
//!
//! Least Recently Used ordering for the local tier's capacity eviction.

use std::collections::{BTreeMap, HashMap};

// == LRU Tracker ==
/// Tracks access order for LRU eviction.
///
/// Every touch stamps the key with a fresh sequence number; the smallest
/// live sequence number is the least recently used key.
#[derive(Debug, Default)]
pub struct LruTracker {
    /// Sequence -> key, oldest first
    order: BTreeMap<u64, String>,
    /// Key -> its current sequence
    positions: HashMap<String, u64>,
    next_seq: u64,
}

impl LruTracker {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used, inserting it if new.
    pub fn touch(&mut self, key: &str) {
        let seq = self.next_seq;
        self.next_seq += 1;

        if let Some(old) = self.positions.insert(key.to_string(), seq) {
            self.order.remove(&old);
        }
        self.order.insert(seq, key.to_string());
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) {
        if let Some(seq) = self.positions.remove(key) {
            self.order.remove(&seq);
        }
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.positions.remove(&key);
        Some(key)
    }
}
