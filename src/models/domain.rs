//! Domain models
//!
//! Normalized shapes of the data we cache. Upstream clients map their raw
//! payloads into these; everything downstream of the cache works on them.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenPrice {
    pub usd: f64,
}

/// Current USD prices keyed by lowercase token address.
pub type TokenPrices = BTreeMap<String, TokenPrice>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPrice {
    /// Unix milliseconds
    pub timestamp: i64,
    pub price: f64,
}

/// Price history keyed by lowercase token address.
pub type TokenHistoricalPrices = BTreeMap<String, Vec<HistoricalPrice>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDefinition {
    pub name: String,
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    pub chain_id: u64,
    #[serde(default, rename = "logoURI")]
    pub logo_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolToken {
    pub address: String,
    pub balance: f64,
    #[serde(default)]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub id: String,
    pub address: String,
    pub total_liquidity: f64,
    pub total_shares: f64,
    #[serde(default)]
    pub tokens: Vec<PoolToken>,
}

/// Current pools next to the same pools 24h ago, for portfolio deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioPools {
    /// Block the previous pools were read at
    pub previous_block: u64,
    pub pools: Vec<Pool>,
    pub previous_pools: Vec<Pool>,
}

/// Curated pool lists maintained outside the chain. Every list may be
/// missing upstream and reads as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolConfig {
    pub paused_pools: Vec<String>,
    pub featured_pools: Vec<String>,
    pub incentivized_pools: Vec<String>,
    pub blacklisted_pools: Vec<String>,
    pub home_featured_pools: Vec<String>,
    pub pool_filters: Vec<serde_json::Value>,
    pub home_news_items: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    /// Unix seconds
    pub timestamp: i64,
}

/// Cumulative protocol counters as of one block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolSnapshot {
    pub total_liquidity: f64,
    pub total_swap_volume: f64,
    pub total_swap_fee: f64,
    pub pool_count: u64,
}

/// Protocol-wide statistics served to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolData {
    pub total_liquidity: f64,
    pub total_swap_volume: f64,
    pub total_swap_fee: f64,
    pub swap_volume_24h: f64,
    pub swap_fee_24h: f64,
    pub pool_count: u64,
    pub token_price: f64,
    pub market_cap: f64,
    pub circulating_supply: f64,
}

/// Protocol counters captured at the first block of a UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    pub block: Block,
    pub snapshot: ProtocolSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterChef {
    pub id: String,
    /// Reward tokens emitted per second across all farms
    pub emissions_per_sec: f64,
    pub total_alloc_point: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Farm {
    pub id: String,
    /// Address of the staked LP token
    pub pair: String,
    pub alloc_point: u64,
    pub staked_balance: f64,
    pub master_chef: MasterChef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmUser {
    pub id: String,
    pub farm_id: String,
    pub address: String,
    pub amount: f64,
    pub reward_debt: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_definition_wire_names() {
        let json = r#"{"name":"Wrapped AVAX","address":"0xabc","symbol":"WAVAX","decimals":18,"chainId":43114,"logoURI":"https://x/y.png"}"#;
        let token: TokenDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(token.chain_id, 43114);
        assert_eq!(token.logo_uri.as_deref(), Some("https://x/y.png"));
    }

    #[test]
    fn test_pool_tokens_default_to_empty() {
        let json = r#"{"id":"p1","address":"0x1","totalLiquidity":10.0,"totalShares":5.0}"#;
        let pool: Pool = serde_json::from_str(json).unwrap();
        assert!(pool.tokens.is_empty());
    }

    #[test]
    fn test_protocol_data_serializes_camel_case() {
        let data = ProtocolData {
            total_liquidity: 1.0,
            total_swap_volume: 2.0,
            total_swap_fee: 3.0,
            swap_volume_24h: 4.0,
            swap_fee_24h: 5.0,
            pool_count: 6,
            token_price: 7.0,
            market_cap: 8.0,
            circulating_supply: 9.0,
        };
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"swapVolume24h\":4.0"));
        assert!(json.contains("\"marketCap\":8.0"));
    }

    #[test]
    fn test_pool_config_missing_lists_read_as_empty() {
        let json = r#"{"featuredPools":["p1"],"poolFilters":[{"id":"stable","pools":["p2"]}]}"#;
        let config: PoolConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.featured_pools, vec!["p1".to_string()]);
        assert_eq!(config.pool_filters[0]["id"], "stable");
        assert!(config.paused_pools.is_empty());
        assert!(config.home_news_items.is_empty());
    }
}
