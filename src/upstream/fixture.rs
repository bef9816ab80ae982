//! In-memory market data used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::MarketDataSource;
use crate::error::{CacheError, Result};
use crate::models::{
    Block, Farm, FarmUser, HistoricalPrice, MasterChef, Pool, PoolConfig, PoolToken,
    ProtocolSnapshot, TokenDefinition, TokenPrice, TokenPrices,
};

pub const WAVAX: &str = "0xaaaa000000000000000000000000000000000001";
pub const USDC: &str = "0xbbbb000000000000000000000000000000000002";
pub const EMBR: &str = "0xcccc000000000000000000000000000000000003";
pub const GOVERNANCE_POOL: &str = "embr-usdc";

#[derive(Default)]
pub struct FixtureState {
    pub pools: Vec<Pool>,
    pub pools_at_block: HashMap<u64, Vec<Pool>>,
    pub pool_config: PoolConfig,
    pub prices: TokenPrices,
    pub pool_prices: TokenPrices,
    pub history: HashMap<String, Vec<HistoricalPrice>>,
    pub pool_history: HashMap<String, Vec<HistoricalPrice>>,
    pub tokens: Vec<TokenDefinition>,
    /// Sorted by timestamp
    pub blocks: Vec<Block>,
    pub average_block_time: f64,
    pub head_snapshot: Option<ProtocolSnapshot>,
    pub block_snapshots: HashMap<u64, ProtocolSnapshot>,
    pub circulating_supply: f64,
    pub farms: Vec<Farm>,
    pub farm_users: Vec<FarmUser>,
    /// Sources that currently fail
    pub failing: HashSet<&'static str>,
    pub calls: HashMap<&'static str, usize>,
}

#[derive(Default)]
pub struct FixtureMarketData {
    state: Mutex<FixtureState>,
}

impl FixtureMarketData {
    pub fn new(state: FixtureState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Two pools, three tokens and a protocol history with a 24h delta.
    pub fn sample() -> Self {
        let pool = |id: &str, liquidity: f64, shares: f64, tokens: &[&str]| Pool {
            id: id.to_string(),
            address: format!("0x{id}"),
            total_liquidity: liquidity,
            total_shares: shares,
            tokens: tokens
                .iter()
                .map(|address| PoolToken {
                    address: address.to_string(),
                    balance: 100.0,
                    weight: Some(0.5),
                })
                .collect(),
        };
        let snapshot = |volume: f64, fee: f64| ProtocolSnapshot {
            total_liquidity: 1_000_000.0,
            total_swap_volume: volume,
            total_swap_fee: fee,
            pool_count: 2,
        };
        let master_chef = MasterChef {
            id: "chef".to_string(),
            emissions_per_sec: 1.5,
            total_alloc_point: 100,
        };

        let point = |timestamp: i64, price: f64| HistoricalPrice { timestamp, price };

        Self::new(FixtureState {
            pools: vec![
                pool("wavax-usdc", 5_000.0, 100.0, &[WAVAX, USDC]),
                pool(GOVERNANCE_POOL, 200.0, 100.0, &[EMBR, USDC]),
            ],
            pools_at_block: [(100, vec![pool("wavax-usdc", 4_000.0, 100.0, &[WAVAX, USDC])])]
                .into_iter()
                .collect(),
            pool_config: PoolConfig {
                featured_pools: vec![GOVERNANCE_POOL.to_string()],
                paused_pools: vec!["wavax-usdc".to_string()],
                ..PoolConfig::default()
            },
            prices: [(WAVAX, 20.0), (USDC, 1.0)]
                .into_iter()
                .map(|(address, usd)| (address.to_string(), TokenPrice { usd }))
                .collect(),
            pool_prices: [(EMBR.to_string(), TokenPrice { usd: 2.0 })]
                .into_iter()
                .collect(),
            history: [(WAVAX.to_string(), vec![point(1_000, 18.0), point(2_000, 19.0)])]
                .into_iter()
                .collect(),
            pool_history: [(EMBR.to_string(), vec![point(1_000, 1.5), point(2_000, 1.8)])]
                .into_iter()
                .collect(),
            tokens: vec![TokenDefinition {
                name: "Embr".to_string(),
                address: EMBR.to_string(),
                symbol: "EMBR".to_string(),
                decimals: 18,
                chain_id: 43114,
                logo_uri: None,
            }],
            blocks: vec![
                Block {
                    number: 100,
                    timestamp: 0,
                },
                Block {
                    number: 200,
                    timestamp: 86_400,
                },
            ],
            average_block_time: 2.1,
            head_snapshot: Some(snapshot(5_000.0, 15.0)),
            block_snapshots: [(100, snapshot(3_000.0, 9.0))].into_iter().collect(),
            circulating_supply: 1_000.0,
            farms: vec![Farm {
                id: "0".to_string(),
                pair: format!("0x{GOVERNANCE_POOL}"),
                alloc_point: 60,
                staked_balance: 50.0,
                master_chef,
            }],
            farm_users: vec![
                FarmUser {
                    id: "0-0xuser".to_string(),
                    farm_id: "0".to_string(),
                    address: "0xuser".to_string(),
                    amount: 10.0,
                    reward_debt: 1.0,
                },
                FarmUser {
                    id: "0-0xother".to_string(),
                    farm_id: "0".to_string(),
                    address: "0xother".to_string(),
                    amount: 5.0,
                    reward_debt: 0.0,
                },
            ],
            ..FixtureState::default()
        })
    }

    pub fn state(&self) -> MutexGuard<'_, FixtureState> {
        self.state.lock().unwrap()
    }

    pub fn fail(&self, source: &'static str) {
        self.state().failing.insert(source);
    }

    pub fn recover(&self, source: &'static str) {
        self.state().failing.remove(source);
    }

    pub fn calls(&self, source: &'static str) -> usize {
        self.state().calls.get(source).copied().unwrap_or(0)
    }

    fn call<T>(&self, source: &'static str, read: impl FnOnce(&FixtureState) -> Result<T>) -> Result<T> {
        let mut state = self.state();
        *state.calls.entry(source).or_default() += 1;
        if state.failing.contains(source) {
            return Err(CacheError::upstream(source, "fixture failure"));
        }
        read(&state)
    }
}

#[async_trait]
impl MarketDataSource for FixtureMarketData {
    async fn fetch_pools(&self) -> Result<Vec<Pool>> {
        self.call("pools", |s| Ok(s.pools.clone()))
    }

    async fn fetch_pools_at(&self, block: u64) -> Result<Vec<Pool>> {
        self.call("past-pools", |s| {
            s.pools_at_block
                .get(&block)
                .cloned()
                .ok_or_else(|| CacheError::upstream("past-pools", "unknown block"))
        })
    }

    async fn fetch_pool_config(&self) -> Result<PoolConfig> {
        self.call("pool-config", |s| Ok(s.pool_config.clone()))
    }

    async fn fetch_token_prices(&self, addresses: &[String]) -> Result<TokenPrices> {
        self.call("token-prices", |s| {
            Ok(addresses
                .iter()
                .filter_map(|a| s.prices.get(a).map(|p| (a.clone(), *p)))
                .collect())
        })
    }

    async fn fetch_pool_prices(&self, addresses: &[String]) -> Result<TokenPrices> {
        self.call("pool-prices", |s| {
            Ok(addresses
                .iter()
                .filter_map(|a| s.pool_prices.get(a).map(|p| (a.clone(), *p)))
                .collect())
        })
    }

    async fn fetch_historical_prices(
        &self,
        address: &str,
        _days: u32,
    ) -> Result<Vec<HistoricalPrice>> {
        self.call("historical-prices", |s| {
            s.history
                .get(address)
                .cloned()
                .ok_or_else(|| CacheError::upstream("historical-prices", "unknown token"))
        })
    }

    async fn fetch_pool_historical_prices(
        &self,
        address: &str,
        _days: u32,
    ) -> Result<Vec<HistoricalPrice>> {
        self.call("pool-historical-prices", |s| {
            s.pool_history
                .get(address)
                .cloned()
                .ok_or_else(|| CacheError::upstream("pool-historical-prices", "no pool for token"))
        })
    }

    async fn fetch_token_definitions(&self) -> Result<Vec<TokenDefinition>> {
        self.call("tokens", |s| Ok(s.tokens.clone()))
    }

    async fn fetch_block_at(&self, timestamp: i64) -> Result<Block> {
        self.call("blocks", |s| {
            s.blocks
                .iter()
                .find(|b| b.timestamp >= timestamp)
                .or_else(|| s.blocks.last())
                .copied()
                .ok_or_else(|| CacheError::upstream("blocks", "no blocks"))
        })
    }

    async fn fetch_average_block_time(&self) -> Result<f64> {
        self.call("average-block-time", |s| Ok(s.average_block_time))
    }

    async fn fetch_protocol_snapshot(&self, block: Option<u64>) -> Result<ProtocolSnapshot> {
        self.call("protocol", |s| {
            let snapshot = match block {
                Some(number) => s.block_snapshots.get(&number).copied(),
                None => s.head_snapshot,
            };
            snapshot.ok_or_else(|| CacheError::upstream("protocol", "unknown block"))
        })
    }

    async fn fetch_circulating_supply(&self) -> Result<f64> {
        self.call("circulating-supply", |s| Ok(s.circulating_supply))
    }

    async fn fetch_farms(&self) -> Result<Vec<Farm>> {
        self.call("farms", |s| Ok(s.farms.clone()))
    }

    async fn fetch_farm_users(&self) -> Result<Vec<FarmUser>> {
        self.call("farm-users", |s| Ok(s.farm_users.clone()))
    }
}
