//! API Handlers
//!
//! HTTP request handlers for each market cache endpoint. Handlers only
//! read through the services; nothing here talks to an upstream directly.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;

use crate::cache::CachedAccessor;
use crate::error::{CacheError, Result};
use crate::models::{
    CirculatingSupplyResponse, DailySnapshot, Farm, FarmUser, HealthResponse, Pool, PoolConfig,
    PortfolioPools, PriceResponse, PricesQuery, ProtocolData, StatsResponse, TokenDefinition,
    TokenPrices,
};
use crate::services::{Services, TokenPriceService};
use crate::tasks::{JobStatus, RefreshScheduler};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    /// Kept for cache statistics
    pub accessor: Arc<CachedAccessor>,
    /// Kept for job status reporting
    pub scheduler: Arc<RefreshScheduler>,
}

impl AppState {
    pub fn new(
        services: Services,
        accessor: Arc<CachedAccessor>,
        scheduler: Arc<RefreshScheduler>,
    ) -> Self {
        Self {
            services,
            accessor,
            scheduler,
        }
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.accessor.stats(),
        state.accessor.durable().name(),
    ))
}

/// Handler for GET /jobs
pub async fn jobs_handler(State(state): State<AppState>) -> Json<Vec<JobStatus>> {
    Json(state.scheduler.statuses())
}

/// Handler for GET /token-prices
///
/// Current prices, or with `?at=<unix ms>` the historical prices closest
/// to that instant.
pub async fn token_prices_handler(
    State(state): State<AppState>,
    Query(query): Query<PricesQuery>,
) -> Result<Json<TokenPrices>> {
    query.validate()?;

    let prices = match query.at {
        Some(at) => {
            let history = state.services.prices.get_historical_prices().await;
            TokenPriceService::prices_at(&history, at)
        }
        None => state.services.prices.get_token_prices().await,
    };
    Ok(Json(prices))
}

/// Handler for GET /token-prices/:address
pub async fn token_price_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<PriceResponse>> {
    let address = address.to_lowercase();
    let prices = state.services.prices.get_token_prices().await;

    if !prices.contains_key(&address) {
        return Err(CacheError::NotFound(format!("no price for token {address}")));
    }
    let usd = TokenPriceService::price_for_token(&prices, &address);
    Ok(Json(PriceResponse::new(address, usd)))
}

/// Handler for GET /tokens
pub async fn tokens_handler(State(state): State<AppState>) -> Result<Json<Vec<TokenDefinition>>> {
    Ok(Json(state.services.tokens.get_tokens().await?))
}

/// Handler for GET /pools
pub async fn pools_handler(State(state): State<AppState>) -> Result<Json<Vec<Pool>>> {
    Ok(Json(state.services.pools.get_pools().await?))
}

/// Handler for GET /pools/past
///
/// Pools as of the block from 24h ago.
pub async fn past_pools_handler(State(state): State<AppState>) -> Result<Json<Vec<Pool>>> {
    Ok(Json(state.services.portfolio.get_past_pools().await?))
}

/// Handler for GET /portfolio-pools
pub async fn portfolio_pools_handler(
    State(state): State<AppState>,
) -> Result<Json<PortfolioPools>> {
    Ok(Json(state.services.portfolio.get_portfolio_pools().await?))
}

/// Handler for GET /pool-config
pub async fn pool_config_handler(State(state): State<AppState>) -> Result<Json<PoolConfig>> {
    Ok(Json(state.services.pool_config.get_pool_config().await?))
}

/// Handler for GET /protocol-data
pub async fn protocol_data_handler(State(state): State<AppState>) -> Result<Json<ProtocolData>> {
    Ok(Json(state.services.protocol.get_protocol_data().await?))
}

/// Handler for GET /circulating-supply
pub async fn circulating_supply_handler(
    State(state): State<AppState>,
) -> Result<Json<CirculatingSupplyResponse>> {
    let circulating_supply = state.services.protocol.circulating_supply().await?;
    Ok(Json(CirculatingSupplyResponse { circulating_supply }))
}

/// Handler for GET /farms
pub async fn farms_handler(State(state): State<AppState>) -> Result<Json<Vec<Farm>>> {
    Ok(Json(state.services.farms.get_farms().await?))
}

/// Handler for GET /farms/users/:address
pub async fn user_farms_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Vec<FarmUser>>> {
    Ok(Json(state.services.farms.farms_for_user(&address).await?))
}

/// Handler for GET /farms/:farm_id/users/:address
pub async fn farm_user_handler(
    State(state): State<AppState>,
    Path((farm_id, address)): Path<(String, String)>,
) -> Result<Json<FarmUser>> {
    state
        .services
        .farms
        .farm_user(&farm_id, &address)
        .await?
        .map(Json)
        .ok_or_else(|| {
            CacheError::NotFound(format!("no position for {address} in farm {farm_id}"))
        })
}

/// Handler for GET /protocol-daily/:date
///
/// `date` is `YYYY-MM-DD` or `latest`.
pub async fn daily_snapshot_handler(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DailySnapshot>> {
    let daily = &state.services.daily;
    let snapshot = if date == "latest" {
        daily.latest_snapshot().await
    } else {
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
            CacheError::InvalidRequest(format!("invalid date '{date}', expected YYYY-MM-DD: {e}"))
        })?;
        daily.daily_snapshot(date).await
    };

    snapshot
        .map(Json)
        .ok_or_else(|| CacheError::NotFound(format!("no daily snapshot for {date}")))
}
