//! HTTP market data gateway
//!
//! Talks to a JSON gateway that fronts the subgraphs, the price API and
//! the chain RPC. Every endpoint is a plain `GET` returning the domain
//! shape directly.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use super::MarketDataSource;
use crate::error::{CacheError, Result};
use crate::models::{
    Block, Farm, FarmUser, HistoricalPrice, Pool, PoolConfig, ProtocolSnapshot, TokenDefinition,
    TokenPrices,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AverageBlockTime {
    average_block_time: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CirculatingSupply {
    circulating_supply: f64,
}

pub struct HttpMarketData {
    client: Client,
    base_url: Url,
}

impl HttpMarketData {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            CacheError::Configuration(format!("invalid upstream url '{base_url}': {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(CacheError::Configuration(format!(
                "upstream url '{base_url}' cannot be a base"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Internal(format!("failed to build http client: {e}")))?;

        Ok(Self { client, base_url })
    }

    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        url
    }

    /// `source` names the dataset in errors and logs.
    async fn get_json<T: DeserializeOwned>(
        &self,
        source: &str,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.url(segments, query);
        debug!(source, %url, "fetching upstream");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CacheError::upstream(source, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::upstream(
                source,
                format!("unexpected status {status}"),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CacheError::upstream(source, format!("malformed response: {e}")))
    }
}

#[async_trait]
impl MarketDataSource for HttpMarketData {
    async fn fetch_pools(&self) -> Result<Vec<Pool>> {
        self.get_json("pools", &["pools"], &[]).await
    }

    async fn fetch_pools_at(&self, block: u64) -> Result<Vec<Pool>> {
        self.get_json("past-pools", &["pools"], &[("block", block.to_string())])
            .await
    }

    async fn fetch_pool_config(&self) -> Result<PoolConfig> {
        self.get_json("pool-config", &["pool-config"], &[]).await
    }

    async fn fetch_token_prices(&self, addresses: &[String]) -> Result<TokenPrices> {
        self.get_json(
            "token-prices",
            &["prices"],
            &[("addresses", addresses.join(","))],
        )
        .await
    }

    async fn fetch_pool_prices(&self, addresses: &[String]) -> Result<TokenPrices> {
        self.get_json(
            "pool-prices",
            &["pool-prices"],
            &[("addresses", addresses.join(","))],
        )
        .await
    }

    async fn fetch_historical_prices(
        &self,
        address: &str,
        days: u32,
    ) -> Result<Vec<HistoricalPrice>> {
        self.get_json(
            "historical-prices",
            &["prices", address, "history"],
            &[("days", days.to_string())],
        )
        .await
    }

    async fn fetch_pool_historical_prices(
        &self,
        address: &str,
        days: u32,
    ) -> Result<Vec<HistoricalPrice>> {
        self.get_json(
            "pool-historical-prices",
            &["pool-prices", address, "history"],
            &[("days", days.to_string())],
        )
        .await
    }

    async fn fetch_token_definitions(&self) -> Result<Vec<TokenDefinition>> {
        self.get_json("tokens", &["tokens"], &[]).await
    }

    async fn fetch_block_at(&self, timestamp: i64) -> Result<Block> {
        self.get_json(
            "blocks",
            &["blocks", "at"],
            &[("timestamp", timestamp.to_string())],
        )
        .await
    }

    async fn fetch_average_block_time(&self) -> Result<f64> {
        let body: AverageBlockTime = self
            .get_json("blocks", &["blocks", "average-time"], &[])
            .await?;
        Ok(body.average_block_time)
    }

    async fn fetch_protocol_snapshot(&self, block: Option<u64>) -> Result<ProtocolSnapshot> {
        let query: Vec<(&str, String)> = block
            .map(|number| vec![("block", number.to_string())])
            .unwrap_or_default();
        self.get_json("protocol", &["protocol"], &query).await
    }

    async fn fetch_circulating_supply(&self) -> Result<f64> {
        let body: CirculatingSupply = self
            .get_json("circulating-supply", &["circulating-supply"], &[])
            .await?;
        Ok(body.circulating_supply)
    }

    async fn fetch_farms(&self) -> Result<Vec<Farm>> {
        self.get_json("farms", &["farms"], &[]).await
    }

    async fn fetch_farm_users(&self) -> Result<Vec<FarmUser>> {
        self.get_json("farm-users", &["farm-users"], &[]).await
    }
}
