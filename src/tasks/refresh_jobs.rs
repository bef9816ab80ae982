//! Refresh Jobs
//!
//! The concrete set of jobs keeping every cached dataset warm. Each job is
//! a thin wrapper around one service refresh; the scheduler supplies
//! isolation, overlap prevention and (for the daily snapshot) retry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;
use crate::services::Services;
use crate::tasks::{JobDescriptor, RefreshScheduler, RetryPolicy};

/// Refresh periods per dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobIntervals {
    pub token_prices: Duration,
    pub historical_prices: Duration,
    pub tokens: Duration,
    pub average_block_time: Duration,
    pub block_from_24h_ago: Duration,
    pub pools: Duration,
    pub farms: Duration,
    pub farm_users: Duration,
    pub protocol: Duration,
    pub past_pools: Duration,
    pub portfolio_pools: Duration,
    pub pool_config: Duration,
}

impl Default for JobIntervals {
    fn default() -> Self {
        Self {
            token_prices: Duration::from_secs(20),
            historical_prices: Duration::from_secs(300),
            tokens: Duration::from_secs(300),
            average_block_time: Duration::from_secs(300),
            block_from_24h_ago: Duration::from_secs(5),
            pools: Duration::from_secs(5),
            farms: Duration::from_secs(30),
            farm_users: Duration::from_secs(5),
            protocol: Duration::from_secs(30),
            past_pools: Duration::from_secs(30),
            portfolio_pools: Duration::from_secs(30),
            pool_config: Duration::from_secs(300),
        }
    }
}

/// Registers one job that calls `refresh` on a clone of the services and
/// discards its output.
fn register<F, Fut, T>(
    scheduler: &RefreshScheduler,
    services: &Arc<Services>,
    descriptor: JobDescriptor,
    refresh: F,
) -> Result<()>
where
    F: Fn(Arc<Services>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: std::fmt::Debug + Send + 'static,
{
    let services = services.clone();
    let name = descriptor.name.clone();
    scheduler.register_job(descriptor, move || {
        let run = refresh(services.clone());
        let name = name.clone();
        async move {
            let outcome = run.await?;
            debug!(job = %name, ?outcome, "refresh complete");
            Ok(())
        }
    })
}

/// Registers the full refresh schedule. Historical prices and protocol
/// data also run once at startup; the daily snapshot runs at 00:00 UTC
/// with `daily_retry`.
pub fn register_refresh_jobs(
    scheduler: &RefreshScheduler,
    services: Arc<Services>,
    intervals: &JobIntervals,
    daily_retry: RetryPolicy,
) -> Result<()> {
    let s = &services;

    register(
        scheduler,
        s,
        JobDescriptor::every("token-prices", intervals.token_prices),
        |s| async move { s.prices.refresh_token_prices().await },
    )?;
    register(
        scheduler,
        s,
        JobDescriptor::every("historical-prices", intervals.historical_prices).run_on_start(),
        |s| async move { s.prices.refresh_historical_prices().await },
    )?;
    register(
        scheduler,
        s,
        JobDescriptor::every("tokens", intervals.tokens),
        |s| async move { s.tokens.refresh_tokens().await },
    )?;
    register(
        scheduler,
        s,
        JobDescriptor::every("average-block-time", intervals.average_block_time),
        |s| async move { s.blocks.refresh_average_block_time().await },
    )?;
    register(
        scheduler,
        s,
        JobDescriptor::every("block-from-24h-ago", intervals.block_from_24h_ago),
        |s| async move { s.blocks.refresh_block_from_24h_ago().await },
    )?;
    register(
        scheduler,
        s,
        JobDescriptor::every("pools", intervals.pools),
        |s| async move { s.pools.refresh_pools().await },
    )?;
    register(
        scheduler,
        s,
        JobDescriptor::every("farms", intervals.farms),
        |s| async move { s.farms.refresh_farms().await },
    )?;
    register(
        scheduler,
        s,
        JobDescriptor::every("farm-users", intervals.farm_users),
        |s| async move { s.farms.refresh_farm_users().await },
    )?;
    register(
        scheduler,
        s,
        JobDescriptor::every("protocol-data", intervals.protocol).run_on_start(),
        |s| async move { s.protocol.refresh_protocol_data().await },
    )?;
    register(
        scheduler,
        s,
        JobDescriptor::every("past-pools", intervals.past_pools),
        |s| async move { s.portfolio.refresh_past_pools().await },
    )?;
    register(
        scheduler,
        s,
        JobDescriptor::every("portfolio-pools", intervals.portfolio_pools),
        |s| async move { s.portfolio.refresh_portfolio_pools().await },
    )?;
    register(
        scheduler,
        s,
        JobDescriptor::every("pool-config", intervals.pool_config),
        |s| async move { s.pool_config.refresh_pool_config().await },
    )?;
    register(
        scheduler,
        s,
        JobDescriptor::daily_at("protocol-daily-snapshot", 0, 0).with_retry(daily_retry),
        |s| async move { s.daily.cache_today().await },
    )?;

    Ok(())
}
