//! Upstream data sources
//!
//! `MarketDataSource` is the fetch boundary every compute function goes
//! through. Implementations are slow, rate limited and allowed to fail;
//! failures surface as `CacheError::UpstreamFetch`.

mod http;

#[cfg(test)]
pub mod fixture;

pub use http::HttpMarketData;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Block, Farm, FarmUser, HistoricalPrice, Pool, PoolConfig, ProtocolSnapshot, TokenDefinition,
    TokenPrices,
};

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// All pools with their token balances.
    async fn fetch_pools(&self) -> Result<Vec<Pool>>;

    /// Pools as they were at `block`.
    async fn fetch_pools_at(&self, block: u64) -> Result<Vec<Pool>>;

    /// Curated pool lists (featured, paused, blacklisted...).
    async fn fetch_pool_config(&self) -> Result<PoolConfig>;

    /// Market prices from the primary price feed. Tokens the feed does
    /// not know are simply absent from the result.
    async fn fetch_token_prices(&self, addresses: &[String]) -> Result<TokenPrices>;

    /// Prices derived from on-chain pool balances, used for tokens the
    /// primary feed does not cover.
    async fn fetch_pool_prices(&self, addresses: &[String]) -> Result<TokenPrices>;

    async fn fetch_historical_prices(
        &self,
        address: &str,
        days: u32,
    ) -> Result<Vec<HistoricalPrice>>;

    /// Price history rebuilt from the token's pool swaps, for tokens the
    /// primary feed has no history for.
    async fn fetch_pool_historical_prices(
        &self,
        address: &str,
        days: u32,
    ) -> Result<Vec<HistoricalPrice>>;

    async fn fetch_token_definitions(&self) -> Result<Vec<TokenDefinition>>;

    /// First block at or after `timestamp` (unix seconds).
    async fn fetch_block_at(&self, timestamp: i64) -> Result<Block>;

    /// Average block time in seconds over the recent window.
    async fn fetch_average_block_time(&self) -> Result<f64>;

    /// Protocol counters at `block`, or at the chain head when `None`.
    async fn fetch_protocol_snapshot(&self, block: Option<u64>) -> Result<ProtocolSnapshot>;

    async fn fetch_circulating_supply(&self) -> Result<f64>;

    async fn fetch_farms(&self) -> Result<Vec<Farm>>;

    async fn fetch_farm_users(&self) -> Result<Vec<FarmUser>>;
}
