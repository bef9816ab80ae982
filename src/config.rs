//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::TierTtl;
use crate::error::{CacheError, Result};
use crate::tasks::RetryPolicy;

/// Local/durable TTL pair in seconds, as configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPair {
    pub l1_secs: u64,
    pub l2_secs: u64,
}

impl TtlPair {
    pub const fn new(l1_secs: u64, l2_secs: u64) -> Self {
        Self { l1_secs, l2_secs }
    }

    fn load(lookup: &impl Fn(&str) -> Option<String>, prefix: &str, default: TtlPair) -> Self {
        Self {
            l1_secs: parse_or(lookup, &format!("{prefix}_TTL_L1_SECS"), default.l1_secs),
            l2_secs: parse_or(lookup, &format!("{prefix}_TTL_L2_SECS"), default.l2_secs),
        }
    }

    fn tier_ttl(&self, dataset: &str) -> Result<TierTtl> {
        TierTtl::from_secs(self.l1_secs, self.l2_secs).map_err(|e| match e {
            CacheError::Configuration(msg) => {
                CacheError::Configuration(format!("{dataset} ttl: {msg}"))
            }
            other => other,
        })
    }
}

/// Configured TTL pairs per dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlConfig {
    pub price: TtlPair,
    pub historical_price: TtlPair,
    pub protocol: TtlPair,
    pub farm_users: TtlPair,
    pub farms: TtlPair,
    pub pools: TtlPair,
    pub block: TtlPair,
    pub average_block_time: TtlPair,
    pub tokens: TtlPair,
    pub snapshot: TtlPair,
    pub past_pools: TtlPair,
    pub portfolio_pools: TtlPair,
    pub pool_config: TtlPair,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            price: TtlPair::new(5, 30),
            historical_price: TtlPair::new(60, 86_400),
            protocol: TtlPair::new(15, 60),
            farm_users: TtlPair::new(15, 30),
            farms: TtlPair::new(15, 86_400),
            pools: TtlPair::new(5, 30),
            block: TtlPair::new(5, 30),
            average_block_time: TtlPair::new(60, 600),
            tokens: TtlPair::new(300, 2_592_000),
            snapshot: TtlPair::new(3_600, 2_592_000),
            past_pools: TtlPair::new(30, 300),
            portfolio_pools: TtlPair::new(30, 300),
            pool_config: TtlPair::new(300, 3_600),
        }
    }
}

/// Validated TTLs handed to the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub price: TierTtl,
    pub historical_price: TierTtl,
    pub protocol: TierTtl,
    pub farm_users: TierTtl,
    pub farms: TierTtl,
    pub pools: TierTtl,
    pub block: TierTtl,
    pub average_block_time: TierTtl,
    pub tokens: TierTtl,
    pub snapshot: TierTtl,
    pub past_pools: TierTtl,
    pub portfolio_pools: TierTtl,
    pub pool_config: TierTtl,
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Maximum number of entries the local tier can hold
    pub local_max_entries: usize,
    /// Local tier cleanup interval in seconds
    pub cleanup_interval: u64,
    /// Base URL of the shared key/value server; `None` keeps L2 in process
    pub durable_store_url: Option<String>,
    pub durable_store_timeout_ms: u64,
    /// How long past its TTL a durable entry stays readable as stale
    pub stale_retention_secs: u64,
    /// Default timeout around every compute
    pub compute_timeout_ms: u64,
    pub upstream_url: String,
    pub upstream_timeout_ms: u64,
    pub ttls: TtlConfig,
    pub daily_retry_attempts: u32,
    pub daily_retry_delay_ms: u64,
    /// Pool whose liquidity/share ratio prices the governance token
    pub governance_token_pool_id: Option<String>,
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    lookup(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) reading from an arbitrary source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let ttl = &defaults.ttls;

        Self {
            server_port: parse_or(&lookup, "SERVER_PORT", defaults.server_port),
            local_max_entries: parse_or(&lookup, "LOCAL_MAX_ENTRIES", defaults.local_max_entries),
            cleanup_interval: parse_or(&lookup, "CLEANUP_INTERVAL", defaults.cleanup_interval),
            durable_store_url: non_empty(&lookup, "DURABLE_STORE_URL"),
            durable_store_timeout_ms: parse_or(
                &lookup,
                "DURABLE_STORE_TIMEOUT_MS",
                defaults.durable_store_timeout_ms,
            ),
            stale_retention_secs: parse_or(
                &lookup,
                "STALE_RETENTION_SECS",
                defaults.stale_retention_secs,
            ),
            compute_timeout_ms: parse_or(&lookup, "COMPUTE_TIMEOUT_MS", defaults.compute_timeout_ms),
            upstream_url: non_empty(&lookup, "UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            upstream_timeout_ms: parse_or(
                &lookup,
                "UPSTREAM_TIMEOUT_MS",
                defaults.upstream_timeout_ms,
            ),
            ttls: TtlConfig {
                price: TtlPair::load(&lookup, "PRICE", ttl.price),
                historical_price: TtlPair::load(&lookup, "HISTORICAL_PRICE", ttl.historical_price),
                protocol: TtlPair::load(&lookup, "PROTOCOL", ttl.protocol),
                farm_users: TtlPair::load(&lookup, "FARM_USERS", ttl.farm_users),
                farms: TtlPair::load(&lookup, "FARMS", ttl.farms),
                pools: TtlPair::load(&lookup, "POOLS", ttl.pools),
                block: TtlPair::load(&lookup, "BLOCK", ttl.block),
                average_block_time: TtlPair::load(
                    &lookup,
                    "AVERAGE_BLOCK_TIME",
                    ttl.average_block_time,
                ),
                tokens: TtlPair::load(&lookup, "TOKENS", ttl.tokens),
                snapshot: TtlPair::load(&lookup, "SNAPSHOT", ttl.snapshot),
                past_pools: TtlPair::load(&lookup, "PAST_POOLS", ttl.past_pools),
                portfolio_pools: TtlPair::load(&lookup, "PORTFOLIO_POOLS", ttl.portfolio_pools),
                pool_config: TtlPair::load(&lookup, "POOL_CONFIG", ttl.pool_config),
            },
            daily_retry_attempts: parse_or(
                &lookup,
                "DAILY_RETRY_ATTEMPTS",
                defaults.daily_retry_attempts,
            ),
            daily_retry_delay_ms: parse_or(
                &lookup,
                "DAILY_RETRY_DELAY_MS",
                defaults.daily_retry_delay_ms,
            ),
            governance_token_pool_id: non_empty(&lookup, "GOVERNANCE_TOKEN_POOL_ID"),
        }
    }

    /// Rejects configurations the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.local_max_entries == 0 {
            return Err(CacheError::Configuration(
                "LOCAL_MAX_ENTRIES must be greater than zero".to_string(),
            ));
        }
        if self.cleanup_interval == 0 {
            return Err(CacheError::Configuration(
                "CLEANUP_INTERVAL must be greater than zero".to_string(),
            ));
        }
        if self.compute_timeout_ms == 0 {
            return Err(CacheError::Configuration(
                "COMPUTE_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }
        self.daily_retry_policy()?;
        self.cache_ttls()?;
        Ok(())
    }

    pub fn cache_ttls(&self) -> Result<CacheTtls> {
        let t = &self.ttls;
        Ok(CacheTtls {
            price: t.price.tier_ttl("price")?,
            historical_price: t.historical_price.tier_ttl("historical price")?,
            protocol: t.protocol.tier_ttl("protocol")?,
            farm_users: t.farm_users.tier_ttl("farm users")?,
            farms: t.farms.tier_ttl("farms")?,
            pools: t.pools.tier_ttl("pools")?,
            block: t.block.tier_ttl("block")?,
            average_block_time: t.average_block_time.tier_ttl("average block time")?,
            tokens: t.tokens.tier_ttl("tokens")?,
            snapshot: t.snapshot.tier_ttl("snapshot")?,
            past_pools: t.past_pools.tier_ttl("past pools")?,
            portfolio_pools: t.portfolio_pools.tier_ttl("portfolio pools")?,
            pool_config: t.pool_config.tier_ttl("pool config")?,
        })
    }

    pub fn daily_retry_policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::new(
            self.daily_retry_attempts,
            Duration::from_millis(self.daily_retry_delay_ms),
        )
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }

    pub fn durable_store_timeout(&self) -> Duration {
        Duration::from_millis(self.durable_store_timeout_ms)
    }

    pub fn stale_retention(&self) -> Duration {
        Duration::from_secs(self.stale_retention_secs)
    }

    pub fn compute_timeout(&self) -> Duration {
        Duration::from_millis(self.compute_timeout_ms)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 4000,
            local_max_entries: 10_000,
            cleanup_interval: 30,
            durable_store_url: None,
            durable_store_timeout_ms: 1_500,
            stale_retention_secs: 604_800,
            compute_timeout_ms: 20_000,
            upstream_url: "http://localhost:8080".to_string(),
            upstream_timeout_ms: 15_000,
            ttls: TtlConfig::default(),
            daily_retry_attempts: 10,
            daily_retry_delay_ms: 5_000,
            governance_token_pool_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 4000);
        assert_eq!(config.local_max_entries, 10_000);
        assert_eq!(config.ttls.price, TtlPair::new(5, 30));
        assert!(config.durable_store_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        env::remove_var("SERVER_PORT");
        env::remove_var("DURABLE_STORE_URL");

        let config = Config::from_env();
        assert_eq!(config.server_port, 4000);
        assert!(config.durable_store_url.is_none());
    }

    #[test]
    fn test_overrides_and_unparseable_fallback() {
        let config = config_from(&[
            ("SERVER_PORT", "8081"),
            ("LOCAL_MAX_ENTRIES", "lots"),
            ("PRICE_TTL_L1_SECS", "2"),
            ("DURABLE_STORE_URL", "http://kv:3000"),
            ("GOVERNANCE_TOKEN_POOL_ID", "  "),
        ]);
        assert_eq!(config.server_port, 8081);
        assert_eq!(config.local_max_entries, 10_000);
        assert_eq!(config.ttls.price, TtlPair::new(2, 30));
        assert_eq!(config.durable_store_url.as_deref(), Some("http://kv:3000"));
        assert!(config.governance_token_pool_id.is_none());
    }

    #[test]
    fn test_validate_rejects_inverted_ttl_pair() {
        let config = config_from(&[("POOLS_TTL_L1_SECS", "60"), ("POOLS_TTL_L2_SECS", "30")]);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CacheError::Configuration(ref msg) if msg.contains("pools")));
    }

    #[test]
    fn test_pool_config_ttl_override() {
        let config = config_from(&[("POOL_CONFIG_TTL_L2_SECS", "7200")]);
        assert_eq!(config.ttls.pool_config, TtlPair::new(300, 7_200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_retry_attempts() {
        let config = config_from(&[("DAILY_RETRY_ATTEMPTS", "0")]);
        assert!(matches!(
            config.validate(),
            Err(CacheError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = config_from(&[("LOCAL_MAX_ENTRIES", "0")]);
        assert!(config.validate().is_err());
    }
}
