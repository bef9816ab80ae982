//! Curated pool lists

use std::sync::Arc;

use crate::cache::{CachedAccessor, TierTtl};
use crate::error::Result;
use crate::models::PoolConfig;
use crate::services::keys;
use crate::upstream::MarketDataSource;

pub struct PoolConfigService {
    accessor: Arc<CachedAccessor>,
    upstream: Arc<dyn MarketDataSource>,
    ttl: TierTtl,
}

impl PoolConfigService {
    pub fn new(
        accessor: Arc<CachedAccessor>,
        upstream: Arc<dyn MarketDataSource>,
        ttl: TierTtl,
    ) -> Self {
        Self {
            accessor,
            upstream,
            ttl,
        }
    }

    pub async fn get_pool_config(&self) -> Result<PoolConfig> {
        self.accessor
            .get_or_compute(keys::POOL_CONFIG, self.ttl, || {
                self.upstream.fetch_pool_config()
            })
            .await
    }

    pub async fn refresh_pool_config(&self) -> Result<PoolConfig> {
        self.accessor
            .refresh(keys::POOL_CONFIG, self.ttl, || self.upstream.fetch_pool_config())
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::error::CacheError;
    use crate::services::test_support::harness;
    use crate::upstream::fixture::GOVERNANCE_POOL;

    #[tokio::test]
    async fn test_pool_config_cached() {
        let h = harness();
        let config = h.services.pool_config.get_pool_config().await.unwrap();
        h.services.pool_config.get_pool_config().await.unwrap();

        assert_eq!(config.featured_pools, vec![GOVERNANCE_POOL.to_string()]);
        assert!(config.blacklisted_pools.is_empty());
        assert_eq!(h.upstream.calls("pool-config"), 1);
    }

    #[tokio::test]
    async fn test_refresh_replaces_cached_config() {
        let h = harness();
        h.services.pool_config.get_pool_config().await.unwrap();
        h.upstream.state().pool_config.paused_pools.clear();

        let refreshed = h.services.pool_config.refresh_pool_config().await.unwrap();
        assert!(refreshed.paused_pools.is_empty());
        let config = h.services.pool_config.get_pool_config().await.unwrap();
        assert!(config.paused_pools.is_empty());
    }

    #[tokio::test]
    async fn test_pool_config_outage() {
        let h = harness();
        h.upstream.fail("pool-config");
        let err = h.services.pool_config.get_pool_config().await.unwrap_err();
        assert!(matches!(err, CacheError::UpstreamFetch { .. }));

        h.upstream.recover("pool-config");
        let config = h.services.pool_config.get_pool_config().await.unwrap();
        h.clock.advance(Duration::from_secs(3_601));
        h.upstream.fail("pool-config");
        assert_eq!(h.services.pool_config.get_pool_config().await.unwrap(), config);
    }
}
