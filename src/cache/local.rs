//! Local Store Module
//!
//! The L1 tier: a per-process map with TTL stamps and LRU capacity
//! eviction. Losing it is always safe; it only saves trips to L2.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::cache::{CacheEntry, LruTracker};
use crate::clock::Clock;

#[derive(Debug, Default)]
struct LocalInner {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    evictions: u64,
}

// == Local Store ==
/// In-memory tier with LRU eviction and TTL support.
pub struct LocalStore {
    inner: Mutex<LocalInner>,
    clock: Arc<dyn Clock>,
    /// Maximum number of entries held before the LRU entry is evicted
    max_entries: usize,
}

impl LocalStore {
    // == Constructor ==
    pub fn new(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(LocalInner::default()),
            clock,
            max_entries: max_entries.max(1),
        }
    }

    // A panic while holding the lock leaves plain data behind; keep using it.
    fn lock(&self) -> MutexGuard<'_, LocalInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // == Set ==
    /// Stores a value, overwriting any previous entry and resetting its TTL.
    /// At capacity the least recently used key is evicted first.
    pub fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let now = self.clock.now_ms();
        let mut inner = self.lock();

        if !inner.entries.contains_key(key) && inner.entries.len() >= self.max_entries {
            if let Some(evicted) = inner.lru.evict_oldest() {
                inner.entries.remove(&evicted);
                inner.evictions += 1;
            }
        }

        inner
            .entries
            .insert(key.to_string(), CacheEntry::new(key, value, ttl, now));
        inner.lru.touch(key);
    }

    // == Get ==
    /// Returns the value if present and fresh. Expired entries stay in
    /// place until purged so `get_stale` can still see them.
    pub fn get_fresh(&self, key: &str) -> Option<Vec<u8>> {
        let now = self.clock.now_ms();
        let mut inner = self.lock();

        let value = inner
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())?;
        inner.lru.touch(key);
        Some(value)
    }

    /// Returns the last stored value regardless of age.
    pub fn get_any(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().entries.get(key).map(|entry| entry.value.clone())
    }

    // == Purge Expired ==
    /// Removes every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut inner = self.lock();

        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.entries.remove(key);
            inner.lru.remove(key);
        }

        expired.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn evictions(&self) -> u64 {
        self.lock().evictions
    }
}
