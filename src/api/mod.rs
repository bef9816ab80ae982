//! API Module
//!
//! HTTP handlers and routing for the market cache REST API.
//!
//! # Endpoints
//! - `GET /health`, `/stats`, `/jobs` - service status
//! - `GET /token-prices`, `/token-prices/:address` - current or historical prices
//! - `GET /tokens`, `/pools`, `/farms` - cached datasets
//! - `GET /protocol-data`, `/circulating-supply` - protocol aggregates
//! - `GET /farms/users/:address`, `/farms/:farm_id/users/:address` - farm positions
//! - `GET /protocol-daily/:date` - daily protocol snapshots (`latest` or `YYYY-MM-DD`)

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
