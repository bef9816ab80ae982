//! HTTP Durable Store
//!
//! L2 tier backed by a shared key/value server speaking the small REST
//! dialect of our cache server (`PUT /set`, `GET /get/:key`).
//!
//! The server only knows one expiry, so values are wrapped in an envelope
//! carrying `stored_at` and the logical TTL. The server is told to keep
//! the value for `ttl + stale_retention`; readers decide freshness from
//! the envelope. Every transport or decoding failure reads as a miss.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, TierStore};
use crate::clock::Clock;
use crate::error::{CacheError, Result};

/// Value as stored on the server.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEnvelope {
    stored_at: u64,
    ttl_ms: u64,
    payload: String,
}

#[derive(Debug, Serialize)]
struct SetBody<'a> {
    key: &'a str,
    value: String,
    ttl: u64,
}

#[derive(Debug, Deserialize)]
struct GetBody {
    value: String,
}

pub struct HttpDurableStore {
    client: reqwest::Client,
    base_url: Url,
    clock: Arc<dyn Clock>,
    stale_retention: Duration,
}

impl HttpDurableStore {
    /// Builds a client with a per-request timeout; a timed out request is
    /// a miss, never a hang.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        clock: Arc<dyn Clock>,
        stale_retention: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            CacheError::Configuration(format!("invalid durable store url '{base_url}': {e}"))
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Internal(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            clock,
            stale_retention,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                CacheError::Configuration(format!(
                    "durable store url '{}' cannot be a base",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch_entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let url = self.url(&["get", key])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CacheError::StoreUnavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: GetBody = response
                    .json()
                    .await
                    .map_err(|e| CacheError::Serialization(e.to_string()))?;
                let envelope: StoredEnvelope = serde_json::from_str(&body.value)?;
                Ok(Some(CacheEntry {
                    key: key.to_string(),
                    value: envelope.payload.into_bytes(),
                    stored_at: envelope.stored_at,
                    ttl_ms: envelope.ttl_ms,
                }))
            }
            status => Err(CacheError::StoreUnavailable(format!(
                "unexpected status {status} reading '{key}'"
            ))),
        }
    }

    /// Reads an entry, logging and swallowing failures.
    async fn read(&self, key: &str) -> Option<CacheEntry> {
        match self.fetch_entry(key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "durable store read failed, treating as miss");
                None
            }
        }
    }
}

#[async_trait]
impl TierStore for HttpDurableStore {
    fn name(&self) -> &'static str {
        "http-durable"
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let payload =
            String::from_utf8(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let envelope = StoredEnvelope {
            stored_at: self.clock.now_ms(),
            ttl_ms: ttl.as_millis() as u64,
            payload,
        };
        let physical_ttl = (ttl + self.stale_retention).as_secs().max(1);
        let body = SetBody {
            key,
            value: serde_json::to_string(&envelope)?,
            ttl: physical_ttl,
        };

        let response = self
            .client
            .put(self.url(&["set"])?)
            .json(&body)
            .send()
            .await
            .map_err(|e| CacheError::StoreUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CacheError::StoreUnavailable(format!(
                "unexpected status {} writing '{key}'",
                response.status()
            )));
        }
        debug!(key, physical_ttl, "wrote durable entry");
        Ok(())
    }

    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let now = self.clock.now_ms();
        self.read(key)
            .await
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value)
    }

    async fn get_stale(&self, key: &str) -> Option<Vec<u8>> {
        self.read(key).await.map(|entry| entry.value)
    }

    async fn close(&self) {
        // reqwest pools connections per client; dropping the store releases them.
        info!(url = %self.base_url, "closing durable store client");
    }
}
