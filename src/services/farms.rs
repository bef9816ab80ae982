//! Farms and farm users

use std::sync::Arc;

use crate::cache::{CachedAccessor, TierTtl};
use crate::error::Result;
use crate::models::{Farm, FarmUser};
use crate::services::keys;
use crate::upstream::MarketDataSource;

pub struct FarmService {
    accessor: Arc<CachedAccessor>,
    upstream: Arc<dyn MarketDataSource>,
    farms_ttl: TierTtl,
    users_ttl: TierTtl,
}

impl FarmService {
    pub fn new(
        accessor: Arc<CachedAccessor>,
        upstream: Arc<dyn MarketDataSource>,
        farms_ttl: TierTtl,
        users_ttl: TierTtl,
    ) -> Self {
        Self {
            accessor,
            upstream,
            farms_ttl,
            users_ttl,
        }
    }

    pub async fn get_farms(&self) -> Result<Vec<Farm>> {
        self.accessor
            .get_or_compute(keys::FARMS, self.farms_ttl, || self.upstream.fetch_farms())
            .await
    }

    pub async fn refresh_farms(&self) -> Result<usize> {
        let farms: Vec<Farm> = self
            .accessor
            .refresh(keys::FARMS, self.farms_ttl, || self.upstream.fetch_farms())
            .await?;
        Ok(farms.len())
    }

    pub async fn get_farm_users(&self) -> Result<Vec<FarmUser>> {
        self.accessor
            .get_or_compute(keys::FARM_USERS, self.users_ttl, || {
                self.upstream.fetch_farm_users()
            })
            .await
    }

    pub async fn refresh_farm_users(&self) -> Result<usize> {
        let users: Vec<FarmUser> = self
            .accessor
            .refresh(keys::FARM_USERS, self.users_ttl, || {
                self.upstream.fetch_farm_users()
            })
            .await?;
        Ok(users.len())
    }

    /// Every farm position held by `address`.
    pub async fn farms_for_user(&self, address: &str) -> Result<Vec<FarmUser>> {
        let users = self.get_farm_users().await?;
        Ok(users
            .into_iter()
            .filter(|user| user.address.eq_ignore_ascii_case(address))
            .collect())
    }

    pub async fn farm_user(&self, farm_id: &str, address: &str) -> Result<Option<FarmUser>> {
        let users = self.get_farm_users().await?;
        Ok(users.into_iter().find(|user| {
            user.farm_id == farm_id && user.address.eq_ignore_ascii_case(address)
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::services::test_support::harness;

    #[tokio::test]
    async fn test_farms_for_user_is_case_insensitive() {
        let h = harness();
        let positions = h.services.farms.farms_for_user("0xUSER").await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].amount, 10.0);
    }

    #[tokio::test]
    async fn test_farm_user_lookup() {
        let h = harness();
        let user = h.services.farms.farm_user("0", "0xother").await.unwrap();
        assert_eq!(user.map(|u| u.amount), Some(5.0));
        assert!(h
            .services
            .farms
            .farm_user("9", "0xother")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_farm_users_share_one_cached_list() {
        let h = harness();
        h.services.farms.farms_for_user("0xuser").await.unwrap();
        h.services.farms.farm_user("0", "0xuser").await.unwrap();
        assert_eq!(h.upstream.calls("farm-users"), 1);
    }

    #[tokio::test]
    async fn test_refresh_farms() {
        let h = harness();
        assert_eq!(h.services.farms.refresh_farms().await.unwrap(), 1);
        assert_eq!(h.services.farms.get_farms().await.unwrap()[0].alloc_point, 60);
        assert_eq!(h.upstream.calls("farms"), 1);
    }
}
