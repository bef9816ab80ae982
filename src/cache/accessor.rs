//! Cached Accessor
//!
//! The get-or-compute primitive every data-serving component goes through:
//! local tier, then durable tier, then compute, writing back to both tiers
//! and falling back to the last stored value when compute fails.
//!
//! Concurrent misses on the same key share one compute: the first caller
//! registers an in-flight marker and the rest wait for its result.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::cache::{AccessorCounters, CacheStats, LocalStore, TierStore, TierTtl};
use crate::error::{CacheError, Result};

type FlightResult = std::result::Result<Arc<Vec<u8>>, CacheError>;
type InFlight = Mutex<HashMap<String, broadcast::Sender<FlightResult>>>;

enum Flight<'a> {
    Leader(FlightGuard<'a>),
    Follower(broadcast::Receiver<FlightResult>),
}

/// Owns the in-flight marker for one key. Dropping it without `finish`
/// (the leading caller was cancelled) clears the marker and closes the
/// channel, so waiters compute for themselves.
struct FlightGuard<'a> {
    in_flight: &'a InFlight,
    key: String,
    tx: Option<broadcast::Sender<FlightResult>>,
}

impl FlightGuard<'_> {
    fn finish(mut self, result: FlightResult) {
        if let Some(tx) = self.tx.take() {
            lock(self.in_flight).remove(&self.key);
            // No receivers is fine: nobody was waiting.
            let _ = tx.send(result);
        }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.tx.take().is_some() {
            lock(self.in_flight).remove(&self.key);
        }
    }
}

fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashMap<String, broadcast::Sender<FlightResult>>> {
    in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn decode<T: DeserializeOwned>(key: &str, tier: &str, bytes: &[u8]) -> Option<T> {
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, tier, error = %e, "cached value failed to decode, treating as miss");
            None
        }
    }
}

// == Cached Accessor ==
pub struct CachedAccessor {
    local: Arc<LocalStore>,
    durable: Arc<dyn TierStore>,
    in_flight: InFlight,
    counters: AccessorCounters,
    /// Applied to every compute unless the caller passes its own
    compute_timeout: Duration,
}

impl CachedAccessor {
    pub fn new(
        local: Arc<LocalStore>,
        durable: Arc<dyn TierStore>,
        compute_timeout: Duration,
    ) -> Self {
        Self {
            local,
            durable,
            in_flight: Mutex::new(HashMap::new()),
            counters: AccessorCounters::new(),
            compute_timeout,
        }
    }

    pub fn durable(&self) -> &Arc<dyn TierStore> {
        &self.durable
    }

    // == Get Or Compute ==
    /// Returns the value for `key`, computing it only when neither tier
    /// holds a fresh copy. A failed compute is answered with the last
    /// stored value if there is one; otherwise the error is returned and
    /// the caller picks its own default.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, ttl: TierTtl, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.get_or_compute_with_timeout(key, ttl, self.compute_timeout, compute)
            .await
    }

    /// Same as [`get_or_compute`](Self::get_or_compute) with an explicit
    /// compute timeout. A timeout is handled like any other failure.
    pub async fn get_or_compute_with_timeout<T, F, Fut>(
        &self,
        key: &str,
        ttl: TierTtl,
        timeout: Duration,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.peek(key, ttl).await {
            return Ok(value);
        }

        self.counters.record_miss();
        debug!(key, "cache miss on both tiers");

        match self.compute_shared(key, ttl, timeout, compute).await {
            Ok(value) => Ok(value),
            Err(err) => self.serve_stale(key, err).await,
        }
    }

    // == Peek ==
    /// Tier lookup without compute: local, then durable with promotion.
    pub async fn peek<T>(&self, key: &str, ttl: TierTtl) -> Option<T>
    where
        T: DeserializeOwned,
    {
        if let Some(bytes) = self.local.get_fresh(key) {
            if let Some(value) = decode(key, "local", &bytes) {
                self.counters.record_l1_hit();
                return Some(value);
            }
        }

        let bytes = self.durable.get(key).await?;
        let value = decode(key, self.durable.name(), &bytes)?;
        self.counters.record_l2_hit();
        self.local.set(key, bytes, ttl.l1());
        debug!(key, "promoted durable entry to local tier");
        Some(value)
    }

    /// [`peek`](Self::peek), falling back to the last value ever written
    /// when both tiers have expired it. For reads that must never compute;
    /// a stale answer is counted like any other stale serve.
    pub async fn peek_or_stale<T>(&self, key: &str, ttl: TierTtl) -> Option<T>
    where
        T: DeserializeOwned,
    {
        if let Some(value) = self.peek(key, ttl).await {
            return Some(value);
        }
        let value = self.last_value(key).await?;
        self.counters.record_stale_served();
        debug!(key, "serving stale value without compute");
        Some(value)
    }

    /// The last value written under `key`, whatever its age: the durable
    /// copy first, then the local one. Not counted as a read.
    pub async fn last_value<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        if let Some(bytes) = self.durable.get_stale(key).await {
            if let Some(value) = decode(key, self.durable.name(), &bytes) {
                return Some(value);
            }
        }
        let bytes = self.local.get_any(key)?;
        decode(key, "local", &bytes)
    }

    // == Refresh ==
    /// Recomputes `key` regardless of what the tiers hold. Used by the
    /// refresh scheduler. On failure the existing entries are left alone
    /// and the error is returned to the job.
    pub async fn refresh<T, F, Fut>(&self, key: &str, ttl: TierTtl, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.compute_shared(key, ttl, self.compute_timeout, compute)
            .await
    }

    /// [`refresh`](Self::refresh) with an explicit compute timeout, for
    /// jobs that are known to run long.
    pub async fn refresh_with_timeout<T, F, Fut>(
        &self,
        key: &str,
        ttl: TierTtl,
        timeout: Duration,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.compute_shared(key, ttl, timeout, compute).await
    }

    pub fn stats(&self) -> CacheStats {
        self.counters
            .snapshot(self.local.evictions(), self.local.len())
    }

    /// Releases the durable tier. Called once at shutdown.
    pub async fn close(&self) {
        self.durable.close().await;
    }

    async fn serve_stale<T: DeserializeOwned>(&self, key: &str, err: CacheError) -> Result<T> {
        if let Some(value) = self.last_value(key).await {
            self.counters.record_stale_served();
            warn!(key, error = %err, "compute failed, serving stale value");
            return Ok(value);
        }
        error!(key, error = %err, "compute failed and no stale value exists");
        Err(err)
    }

    fn join_flight(&self, key: &str) -> Flight<'_> {
        let mut in_flight = lock(&self.in_flight);
        if let Some(tx) = in_flight.get(key) {
            return Flight::Follower(tx.subscribe());
        }
        let (tx, _) = broadcast::channel(1);
        in_flight.insert(key.to_string(), tx.clone());
        Flight::Leader(FlightGuard {
            in_flight: &self.in_flight,
            key: key.to_string(),
            tx: Some(tx),
        })
    }

    async fn compute_shared<T, F, Fut>(
        &self,
        key: &str,
        ttl: TierTtl,
        timeout: Duration,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.join_flight(key) {
            Flight::Leader(guard) => {
                let result = self.compute_and_store(key, ttl, timeout, compute).await;
                match result {
                    Ok((value, bytes)) => {
                        guard.finish(Ok(bytes));
                        Ok(value)
                    }
                    Err(err) => {
                        guard.finish(Err(err.clone()));
                        Err(err)
                    }
                }
            }
            Flight::Follower(mut rx) => {
                self.counters.record_coalesced();
                match rx.recv().await {
                    Ok(Ok(bytes)) => serde_json::from_slice(&bytes).map_err(CacheError::from),
                    Ok(Err(err)) => Err(err),
                    Err(_) => {
                        debug!(key, "in-flight compute abandoned, computing locally");
                        self.compute_and_store(key, ttl, timeout, compute)
                            .await
                            .map(|(value, _)| value)
                    }
                }
            }
        }
    }

    async fn compute_and_store<T, F, Fut>(
        &self,
        key: &str,
        ttl: TierTtl,
        timeout: Duration,
        compute: F,
    ) -> Result<(T, Arc<Vec<u8>>)>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.counters.record_compute();

        let outcome = match tokio::time::timeout(timeout, compute()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(CacheError::Timeout {
                key: key.to_string(),
                after_ms: timeout.as_millis() as u64,
            }),
        };
        let value = match outcome {
            Ok(value) => value,
            Err(err) => {
                self.counters.record_compute_failure();
                return Err(err);
            }
        };

        let bytes = serde_json::to_vec(&value)?;
        if let Err(e) = self.durable.put(key, bytes.clone(), ttl.l2()).await {
            warn!(key, error = %e, "durable write failed, value kept locally only");
        }
        self.local.set(key, bytes.clone(), ttl.l1());

        Ok((value, Arc::new(bytes)))
    }
}
