//! Protocol data aggregator
//!
//! Combines the current protocol snapshot, the snapshot at the cached
//! block from 24h ago, the governance token price and the circulating
//! supply into one cached `ProtocolData`. Any failing input fails the
//! whole compute, which the accessor answers with the last good value.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CachedAccessor, TierTtl};
use crate::error::{CacheError, Result};
use crate::models::ProtocolData;
use crate::services::{keys, BlockService, PoolService};
use crate::upstream::MarketDataSource;

pub struct ProtocolService {
    accessor: Arc<CachedAccessor>,
    upstream: Arc<dyn MarketDataSource>,
    pools: Arc<PoolService>,
    blocks: Arc<BlockService>,
    ttl: TierTtl,
    governance_pool_id: Option<String>,
}

impl ProtocolService {
    pub fn new(
        accessor: Arc<CachedAccessor>,
        upstream: Arc<dyn MarketDataSource>,
        pools: Arc<PoolService>,
        blocks: Arc<BlockService>,
        ttl: TierTtl,
        governance_pool_id: Option<String>,
    ) -> Self {
        Self {
            accessor,
            upstream,
            pools,
            blocks,
            ttl,
            governance_pool_id,
        }
    }

    pub async fn get_protocol_data(&self) -> Result<ProtocolData> {
        self.accessor
            .get_or_compute(keys::PROTOCOL_DATA, self.ttl, || {
                self.compute_protocol_data()
            })
            .await
    }

    pub async fn refresh_protocol_data(&self) -> Result<ProtocolData> {
        self.accessor
            .refresh(keys::PROTOCOL_DATA, self.ttl, || self.compute_protocol_data())
            .await
    }

    pub async fn circulating_supply(&self) -> Result<f64> {
        self.accessor
            .get_or_compute(keys::CIRCULATING_SUPPLY, self.ttl, || {
                self.upstream.fetch_circulating_supply()
            })
            .await
    }

    /// Pool liquidity per share of the configured governance pool; zero
    /// when no pool is configured.
    pub async fn governance_token_price(&self) -> Result<f64> {
        let Some(pool_id) = self.governance_pool_id.as_deref() else {
            return Ok(0.0);
        };

        let pool = self.pools.pool(pool_id).await?.ok_or_else(|| {
            CacheError::upstream("pools", format!("governance pool '{pool_id}' not found"))
        })?;

        if pool.total_shares <= 0.0 {
            return Ok(0.0);
        }
        Ok(pool.total_liquidity / pool.total_shares)
    }

    async fn compute_protocol_data(&self) -> Result<ProtocolData> {
        let token_price = self.governance_token_price().await?;
        let circulating_supply = self.circulating_supply().await?;
        let current = self.upstream.fetch_protocol_snapshot(None).await?;

        let block = self.blocks.block_from_24h_ago().await?;
        let previous = self
            .upstream
            .fetch_protocol_snapshot(Some(block.number))
            .await?;
        debug!(block = block.number, "protocol data computed against 24h block");

        Ok(ProtocolData {
            total_liquidity: current.total_liquidity,
            total_swap_volume: current.total_swap_volume,
            total_swap_fee: current.total_swap_fee,
            swap_volume_24h: current.total_swap_volume - previous.total_swap_volume,
            swap_fee_24h: current.total_swap_fee - previous.total_swap_fee,
            pool_count: current.pool_count,
            token_price,
            market_cap: token_price * circulating_supply,
            circulating_supply,
        })
    }
}
