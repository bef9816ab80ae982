//! Data services
//!
//! Every dataset the API serves is read through one of these services,
//! and every one of them goes through the cached accessor: a read is a
//! `get_or_compute` (or a `peek` where compute is too slow to run inline),
//! a scheduled refresh is a `refresh`. The protocol and portfolio services
//! are derived aggregators: their computes read other cached keys before
//! combining them.

pub mod keys;

mod blocks;
mod daily;
mod farms;
mod pool_config;
mod pools;
mod portfolio;
mod prices;
mod protocol;
mod tokens;

pub use blocks::BlockService;
pub use daily::DailySnapshotService;
pub use farms::FarmService;
pub use pool_config::PoolConfigService;
pub use pools::PoolService;
pub use portfolio::PortfolioService;
pub use prices::TokenPriceService;
pub use protocol::ProtocolService;
pub use tokens::TokenService;

use std::sync::Arc;

use crate::cache::CachedAccessor;
use crate::clock::Clock;
use crate::config::CacheTtls;
use crate::upstream::MarketDataSource;

/// All services, wired to one accessor and one upstream.
#[derive(Clone)]
pub struct Services {
    pub pools: Arc<PoolService>,
    pub portfolio: Arc<PortfolioService>,
    pub pool_config: Arc<PoolConfigService>,
    pub tokens: Arc<TokenService>,
    pub prices: Arc<TokenPriceService>,
    pub blocks: Arc<BlockService>,
    pub protocol: Arc<ProtocolService>,
    pub daily: Arc<DailySnapshotService>,
    pub farms: Arc<FarmService>,
}

impl Services {
    pub fn new(
        accessor: Arc<CachedAccessor>,
        upstream: Arc<dyn MarketDataSource>,
        clock: Arc<dyn Clock>,
        ttls: CacheTtls,
        governance_pool_id: Option<String>,
    ) -> Self {
        let pools = Arc::new(PoolService::new(
            accessor.clone(),
            upstream.clone(),
            ttls.pools,
        ));
        let blocks = Arc::new(BlockService::new(
            accessor.clone(),
            upstream.clone(),
            clock.clone(),
            ttls.block,
            ttls.average_block_time,
        ));

        Self {
            portfolio: Arc::new(PortfolioService::new(
                accessor.clone(),
                upstream.clone(),
                pools.clone(),
                blocks.clone(),
                ttls.past_pools,
                ttls.portfolio_pools,
            )),
            pool_config: Arc::new(PoolConfigService::new(
                accessor.clone(),
                upstream.clone(),
                ttls.pool_config,
            )),
            tokens: Arc::new(TokenService::new(
                accessor.clone(),
                upstream.clone(),
                ttls.tokens,
            )),
            prices: Arc::new(TokenPriceService::new(
                accessor.clone(),
                upstream.clone(),
                pools.clone(),
                ttls.price,
                ttls.historical_price,
            )),
            protocol: Arc::new(ProtocolService::new(
                accessor.clone(),
                upstream.clone(),
                pools.clone(),
                blocks.clone(),
                ttls.protocol,
                governance_pool_id,
            )),
            daily: Arc::new(DailySnapshotService::new(
                accessor.clone(),
                upstream.clone(),
                clock,
                ttls.snapshot,
            )),
            farms: Arc::new(FarmService::new(
                accessor,
                upstream,
                ttls.farms,
                ttls.farm_users,
            )),
            pools,
            blocks,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::cache::{CachedAccessor, LocalStore, MemoryDurableStore};
    use crate::clock::ManualClock;
    use crate::config::Config;
    use crate::upstream::fixture::{FixtureMarketData, GOVERNANCE_POOL};

    use super::Services;

    /// 2023-11-14T22:13:20Z
    pub const START_MS: u64 = 1_700_000_000_000;

    pub struct Harness {
        pub clock: Arc<ManualClock>,
        pub durable: Arc<MemoryDurableStore>,
        pub accessor: Arc<CachedAccessor>,
        pub upstream: Arc<FixtureMarketData>,
        pub services: Services,
    }

    pub fn harness() -> Harness {
        harness_with(FixtureMarketData::sample())
    }

    pub fn harness_with(upstream: FixtureMarketData) -> Harness {
        let clock = Arc::new(ManualClock::new(START_MS));
        let local = Arc::new(LocalStore::new(1_000, clock.clone()));
        let durable = Arc::new(MemoryDurableStore::new(
            clock.clone(),
            Duration::from_secs(7 * 24 * 3600),
        ));
        let accessor = Arc::new(CachedAccessor::new(
            local,
            durable.clone(),
            Duration::from_secs(5),
        ));
        let upstream = Arc::new(upstream);
        let ttls = Config::default().cache_ttls().unwrap();
        let services = Services::new(
            accessor.clone(),
            upstream.clone(),
            clock.clone(),
            ttls,
            Some(GOVERNANCE_POOL.to_string()),
        );

        Harness {
            clock,
            durable,
            accessor,
            upstream,
            services,
        }
    }
}
