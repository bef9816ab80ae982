//! API Routes
//!
//! Configures the Axum router with all market cache endpoints.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    circulating_supply_handler, daily_snapshot_handler, farm_user_handler, farms_handler,
    health_handler, jobs_handler, past_pools_handler, pool_config_handler, pools_handler,
    portfolio_pools_handler, protocol_data_handler, stats_handler, token_price_handler,
    token_prices_handler, tokens_handler, user_farms_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/jobs", get(jobs_handler))
        .route("/token-prices", get(token_prices_handler))
        .route("/token-prices/:address", get(token_price_handler))
        .route("/tokens", get(tokens_handler))
        .route("/pools", get(pools_handler))
        .route("/pools/past", get(past_pools_handler))
        .route("/portfolio-pools", get(portfolio_pools_handler))
        .route("/pool-config", get(pool_config_handler))
        .route("/protocol-data", get(protocol_data_handler))
        .route("/circulating-supply", get(circulating_supply_handler))
        .route("/farms", get(farms_handler))
        .route("/farms/users/:address", get(user_farms_handler))
        .route("/farms/:farm_id/users/:address", get(farm_user_handler))
        .route("/protocol-daily/:date", get(daily_snapshot_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
