//! Past and portfolio pools
//!
//! Past pools are the pool list as of the block from 24h ago. Portfolio
//! pools pair them with the current list so per-pool 24h changes can be
//! computed without another chain query; both inputs are cached keys.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CachedAccessor, TierTtl};
use crate::error::Result;
use crate::models::{Pool, PortfolioPools};
use crate::services::{keys, BlockService, PoolService};
use crate::upstream::MarketDataSource;

pub struct PortfolioService {
    accessor: Arc<CachedAccessor>,
    upstream: Arc<dyn MarketDataSource>,
    pools: Arc<PoolService>,
    blocks: Arc<BlockService>,
    past_ttl: TierTtl,
    portfolio_ttl: TierTtl,
}

impl PortfolioService {
    pub fn new(
        accessor: Arc<CachedAccessor>,
        upstream: Arc<dyn MarketDataSource>,
        pools: Arc<PoolService>,
        blocks: Arc<BlockService>,
        past_ttl: TierTtl,
        portfolio_ttl: TierTtl,
    ) -> Self {
        Self {
            accessor,
            upstream,
            pools,
            blocks,
            past_ttl,
            portfolio_ttl,
        }
    }

    // == Past Pools ==
    pub async fn get_past_pools(&self) -> Result<Vec<Pool>> {
        self.accessor
            .get_or_compute(keys::PAST_POOLS, self.past_ttl, || {
                self.compute_past_pools()
            })
            .await
    }

    /// Returns the number of pools cached.
    pub async fn refresh_past_pools(&self) -> Result<usize> {
        let pools: Vec<Pool> = self
            .accessor
            .refresh(keys::PAST_POOLS, self.past_ttl, || self.compute_past_pools())
            .await?;
        Ok(pools.len())
    }

    async fn compute_past_pools(&self) -> Result<Vec<Pool>> {
        let block = self.blocks.block_from_24h_ago().await?;
        self.upstream.fetch_pools_at(block.number).await
    }

    // == Portfolio Pools ==
    pub async fn get_portfolio_pools(&self) -> Result<PortfolioPools> {
        self.accessor
            .get_or_compute(keys::PORTFOLIO_POOLS, self.portfolio_ttl, || {
                self.compute_portfolio_pools()
            })
            .await
    }

    /// Returns the number of current pools cached.
    pub async fn refresh_portfolio_pools(&self) -> Result<usize> {
        let portfolio: PortfolioPools = self
            .accessor
            .refresh(keys::PORTFOLIO_POOLS, self.portfolio_ttl, || {
                self.compute_portfolio_pools()
            })
            .await?;
        Ok(portfolio.pools.len())
    }

    async fn compute_portfolio_pools(&self) -> Result<PortfolioPools> {
        let block = self.blocks.block_from_24h_ago().await?;
        let pools = self.pools.get_pools().await?;
        let previous_pools = self.get_past_pools().await?;
        debug!(
            block = block.number,
            pools = pools.len(),
            previous = previous_pools.len(),
            "portfolio pools computed"
        );

        Ok(PortfolioPools {
            previous_block: block.number,
            pools,
            previous_pools,
        })
    }
}
