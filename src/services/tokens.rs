//! Token definitions

use std::sync::Arc;

use crate::cache::{CachedAccessor, TierTtl};
use crate::error::Result;
use crate::models::TokenDefinition;
use crate::services::keys;
use crate::upstream::MarketDataSource;

pub struct TokenService {
    accessor: Arc<CachedAccessor>,
    upstream: Arc<dyn MarketDataSource>,
    ttl: TierTtl,
}

impl TokenService {
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

    pub async fn get_tokens(&self) -> Result<Vec<TokenDefinition>> {
        self.accessor
            .get_or_compute(keys::TOKEN_DEFINITIONS, self.ttl, || {
                self.upstream.fetch_token_definitions()
            })
            .await
    }

    pub async fn refresh_tokens(&self) -> Result<usize> {
        let tokens: Vec<TokenDefinition> = self
            .accessor
            .refresh(keys::TOKEN_DEFINITIONS, self.ttl, || {
                self.upstream.fetch_token_definitions()
            })
            .await?;
        Ok(tokens.len())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::error::CacheError;
    use crate::services::test_support::harness;

    #[tokio::test]
    async fn test_tokens_served_stale_when_upstream_fails() {
        let h = harness();
        assert_eq!(h.services.tokens.get_tokens().await.unwrap().len(), 1);

        // Past both the local and the durable TTL.
        h.clock.advance(Duration::from_secs(2_592_001));
        h.upstream.fail("tokens");

        let tokens = h.services.tokens.get_tokens().await.unwrap();
        assert_eq!(tokens[0].symbol, "EMBR");
        assert_eq!(h.upstream.calls("tokens"), 2);
    }

    #[tokio::test]
    async fn test_tokens_error_without_prior_value() {
        let h = harness();
        h.upstream.fail("tokens");

        let err = h.services.tokens.get_tokens().await.unwrap_err();
        assert!(matches!(err, CacheError::UpstreamFetch { .. }));
    }
}
