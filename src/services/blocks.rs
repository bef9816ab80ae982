//! Block lookups
//!
//! The block from 24h ago anchors every 24h delta the protocol aggregator
//! computes, so it is refreshed every few seconds.

use std::sync::Arc;

use crate::cache::{CachedAccessor, TierTtl};
use crate::clock::Clock;
use crate::error::Result;
use crate::models::Block;
use crate::services::keys;
use crate::upstream::MarketDataSource;

const DAY_SECS: i64 = 24 * 60 * 60;

pub struct BlockService {
    accessor: Arc<CachedAccessor>,
    upstream: Arc<dyn MarketDataSource>,
    clock: Arc<dyn Clock>,
    ttl: TierTtl,
    average_ttl: TierTtl,
}

impl BlockService {
    pub fn new(
        accessor: Arc<CachedAccessor>,
        upstream: Arc<dyn MarketDataSource>,
        clock: Arc<dyn Clock>,
        ttl: TierTtl,
        average_ttl: TierTtl,
    ) -> Self {
        Self {
            accessor,
            upstream,
            clock,
            ttl,
            average_ttl,
        }
    }

    fn day_ago_secs(&self) -> i64 {
        (self.clock.now_ms() / 1_000) as i64 - DAY_SECS
    }

    pub async fn block_from_24h_ago(&self) -> Result<Block> {
        let timestamp = self.day_ago_secs();
        self.accessor
            .get_or_compute(keys::BLOCK_FROM_24H_AGO, self.ttl, || {
                self.upstream.fetch_block_at(timestamp)
            })
            .await
    }

    pub async fn refresh_block_from_24h_ago(&self) -> Result<Block> {
        let timestamp = self.day_ago_secs();
        self.accessor
            .refresh(keys::BLOCK_FROM_24H_AGO, self.ttl, || {
                self.upstream.fetch_block_at(timestamp)
            })
            .await
    }

    /// Average block time in seconds.
    pub async fn average_block_time(&self) -> Result<f64> {
        self.accessor
            .get_or_compute(keys::AVERAGE_BLOCK_TIME, self.average_ttl, || {
                self.upstream.fetch_average_block_time()
            })
            .await
    }

    pub async fn refresh_average_block_time(&self) -> Result<f64> {
        self.accessor
            .refresh(keys::AVERAGE_BLOCK_TIME, self.average_ttl, || {
                self.upstream.fetch_average_block_time()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::services::test_support::harness;

    #[tokio::test]
    async fn test_block_from_24h_ago_uses_clock() {
        let h = harness();
        h.clock.set(2 * 86_400 * 1_000);

        let block = h.services.blocks.block_from_24h_ago().await.unwrap();
        assert_eq!(block.number, 200);
    }

    #[tokio::test]
    async fn test_block_cached_until_l1_expiry() {
        let h = harness();
        h.clock.set(86_400 * 1_000);
        h.services.blocks.block_from_24h_ago().await.unwrap();
        h.services.blocks.block_from_24h_ago().await.unwrap();
        assert_eq!(h.upstream.calls("blocks"), 1);

        h.clock.advance(Duration::from_secs(31));
        h.services.blocks.block_from_24h_ago().await.unwrap();
        assert_eq!(h.upstream.calls("blocks"), 2);
    }

    #[tokio::test]
    async fn test_average_block_time() {
        let h = harness();
        assert_eq!(h.services.blocks.average_block_time().await.unwrap(), 2.1);
        assert_eq!(
            h.services.blocks.refresh_average_block_time().await.unwrap(),
            2.1
        );
        assert_eq!(h.upstream.calls("average-block-time"), 2);
    }
}
