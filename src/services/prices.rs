//! Token prices
//!
//! Current prices come from the primary price feed, topped up with
//! pool-derived prices for tokens the feed does not list. Historical
//! prices take one upstream call per token and are only ever computed by
//! the scheduled job; reads never compute them.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::{CachedAccessor, TierTtl};
use crate::error::{CacheError, Result};
use crate::models::{TokenHistoricalPrices, TokenPrice, TokenPrices};
use crate::services::{keys, PoolService};
use crate::upstream::MarketDataSource;

/// Days of history kept per token.
const HISTORY_DAYS: u32 = 30;
/// Gap between per-token history calls; the price feed rate limits hard.
const HISTORY_REQUEST_SPACING: Duration = Duration::from_millis(250);
const HISTORY_REFRESH_TIMEOUT: Duration = Duration::from_secs(600);

pub struct TokenPriceService {
    accessor: Arc<CachedAccessor>,
    upstream: Arc<dyn MarketDataSource>,
    pools: Arc<PoolService>,
    price_ttl: TierTtl,
    historical_ttl: TierTtl,
}

impl TokenPriceService {
    pub fn new(
        accessor: Arc<CachedAccessor>,
        upstream: Arc<dyn MarketDataSource>,
        pools: Arc<PoolService>,
        price_ttl: TierTtl,
        historical_ttl: TierTtl,
    ) -> Self {
        Self {
            accessor,
            upstream,
            pools,
            price_ttl,
            historical_ttl,
        }
    }

    // == Current Prices ==
    /// Current prices, or an empty map when none could ever be obtained.
    pub async fn get_token_prices(&self) -> TokenPrices {
        let result = self
            .accessor
            .get_or_compute(keys::TOKEN_PRICES, self.price_ttl, || {
                self.compute_token_prices()
            })
            .await;

        result.unwrap_or_else(|e| {
            warn!(error = %e, "no token prices available, serving empty set");
            TokenPrices::new()
        })
    }

    /// Returns the number of tokens priced.
    pub async fn refresh_token_prices(&self) -> Result<usize> {
        let prices: TokenPrices = self
            .accessor
            .refresh(keys::TOKEN_PRICES, self.price_ttl, || {
                self.compute_token_prices()
            })
            .await?;
        Ok(prices.len())
    }

    async fn compute_token_prices(&self) -> Result<TokenPrices> {
        let addresses = self.pools.token_addresses().await?;

        let (mut prices, feed_error) = match self.upstream.fetch_token_prices(&addresses).await {
            Ok(prices) => (normalize(prices), None),
            Err(e) => {
                warn!(error = %e, "price feed failed, falling back to pool prices");
                (TokenPrices::new(), Some(e))
            }
        };

        // A previously cached set, however old, beats pool prices alone.
        if let Some(e) = feed_error {
            if self
                .accessor
                .last_value::<TokenPrices>(keys::TOKEN_PRICES)
                .await
                .is_some()
            {
                return Err(e);
            }
        }

        let missing: Vec<String> = addresses
            .into_iter()
            .filter(|address| !prices.contains_key(address))
            .collect();
        if !missing.is_empty() {
            let pool_prices = self.upstream.fetch_pool_prices(&missing).await?;
            for (address, price) in normalize(pool_prices) {
                prices.entry(address).or_insert(price);
            }
        }

        Ok(prices)
    }

    // == Historical Prices ==
    /// Cached price history, stale if the job has been failing; empty
    /// until the history job has run once.
    pub async fn get_historical_prices(&self) -> TokenHistoricalPrices {
        self.accessor
            .peek_or_stale(keys::TOKEN_HISTORICAL_PRICES, self.historical_ttl)
            .await
            .unwrap_or_default()
    }

    /// Fetches history token by token. A token the price feed has no
    /// history for falls back to history rebuilt from its pools; when
    /// both fail it keeps its last cached series (or an empty one). The
    /// run fails only when no token got a fresh series.
    pub async fn refresh_historical_prices(&self) -> Result<usize> {
        let history: TokenHistoricalPrices = self
            .accessor
            .refresh_with_timeout(
                keys::TOKEN_HISTORICAL_PRICES,
                self.historical_ttl,
                HISTORY_REFRESH_TIMEOUT,
                || self.compute_historical_prices(),
            )
            .await?;
        Ok(history.len())
    }

    async fn compute_historical_prices(&self) -> Result<TokenHistoricalPrices> {
        let addresses = self.pools.token_addresses().await?;
        let mut history = TokenHistoricalPrices::new();
        let mut missing = Vec::new();

        for (i, address) in addresses.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(HISTORY_REQUEST_SPACING).await;
            }
            match self
                .upstream
                .fetch_historical_prices(address, HISTORY_DAYS)
                .await
            {
                Ok(series) => {
                    history.insert(address.clone(), series);
                }
                Err(e) => {
                    debug!(token = %address, error = %e, "no feed history, trying pools");
                    missing.push(address.clone());
                }
            }
        }

        let mut failed = Vec::new();
        for address in missing {
            match self
                .upstream
                .fetch_pool_historical_prices(&address, HISTORY_DAYS)
                .await
            {
                Ok(series) => {
                    history.insert(address, series);
                }
                Err(e) => {
                    warn!(token = %address, error = %e, "historical price fetch failed");
                    failed.push(address);
                }
            }
        }

        if !addresses.is_empty() && failed.len() == addresses.len() {
            return Err(CacheError::upstream(
                "historical-prices",
                format!("all {} token histories failed", failed.len()),
            ));
        }

        if !failed.is_empty() {
            let mut previous = self
                .accessor
                .last_value::<TokenHistoricalPrices>(keys::TOKEN_HISTORICAL_PRICES)
                .await
                .unwrap_or_default();
            for address in &failed {
                let series = previous.remove(address).unwrap_or_default();
                history.insert(address.clone(), series);
            }
        }

        info!(
            tokens = history.len(),
            failed = failed.len(),
            "historical prices computed"
        );
        Ok(history)
    }

    // == Lookups ==
    /// Case-insensitive price lookup; unknown tokens price at zero.
    pub fn price_for_token(prices: &TokenPrices, address: &str) -> f64 {
        prices
            .get(address)
            .or_else(|| prices.get(&address.to_lowercase()))
            .map(|price| price.usd)
            .unwrap_or(0.0)
    }

    /// Each token's historical price closest to `timestamp` (unix ms).
    /// Tokens with no history price at zero.
    pub fn prices_at(history: &TokenHistoricalPrices, timestamp: i64) -> TokenPrices {
        history
            .iter()
            .map(|(address, series)| {
                let usd = series
                    .iter()
                    .min_by_key(|point| (point.timestamp - timestamp).unsigned_abs())
                    .map(|point| point.price)
                    .unwrap_or(0.0);
                (address.clone(), TokenPrice { usd })
            })
            .collect()
    }
}

fn normalize(prices: TokenPrices) -> TokenPrices {
    prices
        .into_iter()
        .map(|(address, price)| (address.to_lowercase(), price))
        .collect()
}
