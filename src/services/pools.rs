//! Pool list

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cache::{CachedAccessor, TierTtl};
use crate::error::Result;
use crate::models::Pool;
use crate::services::keys;
use crate::upstream::MarketDataSource;

pub struct PoolService {
    accessor: Arc<CachedAccessor>,
    upstream: Arc<dyn MarketDataSource>,
    ttl: TierTtl,
}

impl PoolService {
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

    pub async fn get_pools(&self) -> Result<Vec<Pool>> {
        self.accessor
            .get_or_compute(keys::POOLS, self.ttl, || self.upstream.fetch_pools())
            .await
    }

    /// Returns the number of pools cached.
    pub async fn refresh_pools(&self) -> Result<usize> {
        let pools: Vec<Pool> = self
            .accessor
            .refresh(keys::POOLS, self.ttl, || self.upstream.fetch_pools())
            .await?;
        Ok(pools.len())
    }

    pub async fn pool(&self, id: &str) -> Result<Option<Pool>> {
        let pools = self.get_pools().await?;
        Ok(pools.into_iter().find(|pool| pool.id.eq_ignore_ascii_case(id)))
    }

    /// Every token address held by any pool, lowercased and deduplicated.
    pub async fn token_addresses(&self) -> Result<Vec<String>> {
        let pools = self.get_pools().await?;
        let addresses: BTreeSet<String> = pools
            .iter()
            .flat_map(|pool| pool.tokens.iter())
            .map(|token| token.address.to_lowercase())
            .collect();
        Ok(addresses.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::services::test_support::harness;
    use crate::upstream::fixture::{EMBR, GOVERNANCE_POOL, USDC, WAVAX};

    #[tokio::test]
    async fn test_pools_fetched_once_then_cached() {
        let h = harness();
        let first = h.services.pools.get_pools().await.unwrap();
        let second = h.services.pools.get_pools().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(h.upstream.calls("pools"), 1);
    }

    #[tokio::test]
    async fn test_token_addresses_are_unique_and_lowercase() {
        let h = harness();
        h.upstream.state().pools[0].tokens[0].address = WAVAX.to_uppercase().replace("0X", "0x");

        let addresses = h.services.pools.token_addresses().await.unwrap();
        let mut expected = vec![WAVAX.to_string(), USDC.to_string(), EMBR.to_string()];
        expected.sort();
        assert_eq!(addresses, expected);
    }

    #[tokio::test]
    async fn test_pool_lookup_by_id() {
        let h = harness();
        let pool = h.services.pools.pool(GOVERNANCE_POOL).await.unwrap().unwrap();
        assert_eq!(pool.total_shares, 100.0);
        assert!(h.services.pools.pool("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_replaces_cached_pools() {
        let h = harness();
        h.services.pools.get_pools().await.unwrap();
        h.upstream.state().pools.pop();

        assert_eq!(h.services.pools.refresh_pools().await.unwrap(), 1);
        assert_eq!(h.services.pools.get_pools().await.unwrap().len(), 1);
    }
}
