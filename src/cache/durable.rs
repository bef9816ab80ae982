//! In-process Durable Store
//!
//! L2 tier kept in process memory. Used when no shared key/value server is
//! configured, and in tests. It follows the durable contract exactly:
//! entries outlive their TTL by a retention window for stale fallback,
//! and an unreachable medium (simulated with `set_online(false)`) reads as
//! a miss while writes report `StoreUnavailable`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::{CacheEntry, TierStore};
use crate::clock::Clock;
use crate::error::{CacheError, Result};

pub struct MemoryDurableStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    /// How long past expiry an entry is still kept for `get_stale`
    stale_retention: Duration,
    online: AtomicBool,
}

impl MemoryDurableStore {
    pub fn new(clock: Arc<dyn Clock>, stale_retention: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            stale_retention,
            online: AtomicBool::new(true),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Toggles simulated reachability of the medium.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether the medium would still physically hold this entry.
    fn retained(&self, entry: &CacheEntry, now: u64) -> bool {
        let retention = self.stale_retention.as_millis() as u64;
        now <= entry.expires_at().saturating_add(retention)
    }
}

#[async_trait]
impl TierStore for MemoryDurableStore {
    fn name(&self) -> &'static str {
        "memory-durable"
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        if !self.is_online() {
            return Err(CacheError::StoreUnavailable(format!(
                "in-process durable store offline while writing '{key}'"
            )));
        }
        let now = self.clock.now_ms();
        self.lock()
            .insert(key.to_string(), CacheEntry::new(key, value, ttl, now));
        Ok(())
    }

    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if !self.is_online() {
            return None;
        }
        let now = self.clock.now_ms();
        self.lock()
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())
    }

    async fn get_stale(&self, key: &str) -> Option<Vec<u8>> {
        if !self.is_online() {
            return None;
        }
        let now = self.clock.now_ms();
        let mut entries = self.lock();

        match entries.get(key) {
            Some(entry) if self.retained(entry, now) => Some(entry.value.clone()),
            Some(_) => {
                debug!(key, "dropping entry past stale retention");
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store() -> (MemoryDurableStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        (
            MemoryDurableStore::new(clock.clone(), Duration::from_secs(60)),
            clock,
        )
    }

    #[tokio::test]
    async fn test_put_get() {
        let (store, _) = store();

        store.put("pools", b"[]".to_vec(), Duration::from_secs(30)).await.unwrap();

        assert_eq!(store.get("pools").await, Some(b"[]".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_is_miss_but_stale_readable() {
        let (store, clock) = store();

        store.put("pools", b"1".to_vec(), Duration::from_secs(30)).await.unwrap();
        clock.advance(Duration::from_secs(31));

        assert_eq!(store.get("pools").await, None);
        assert_eq!(store.get_stale("pools").await, Some(b"1".to_vec()));
    }

    #[tokio::test]
    async fn test_stale_dropped_after_retention() {
        let (store, clock) = store();

        store.put("pools", b"1".to_vec(), Duration::from_secs(30)).await.unwrap();
        clock.advance(Duration::from_secs(30 + 61));

        assert_eq!(store.get_stale("pools").await, None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_offline_reads_miss_and_writes_fail() {
        let (store, _) = store();

        store.put("pools", b"1".to_vec(), Duration::from_secs(30)).await.unwrap();
        store.set_online(false);

        assert_eq!(store.get("pools").await, None);
        assert_eq!(store.get_stale("pools").await, None);
        let result = store.put("pools", b"2".to_vec(), Duration::from_secs(30)).await;
        assert!(matches!(result, Err(CacheError::StoreUnavailable(_))));

        store.set_online(true);
        assert_eq!(store.get("pools").await, Some(b"1".to_vec()));
    }
}
