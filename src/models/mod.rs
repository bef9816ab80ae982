//! Domain models and API DTOs
//!
//! `domain` holds the normalized data we cache; `requests` and
//! `responses` are the HTTP-only shapes around it.

pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Block, DailySnapshot, Farm, FarmUser, HistoricalPrice, MasterChef, Pool, PoolConfig, PoolToken,
    PortfolioPools, ProtocolData, ProtocolSnapshot, TokenDefinition, TokenHistoricalPrices,
    TokenPrice, TokenPrices,
};
pub use requests::PricesQuery;
pub use responses::{CirculatingSupplyResponse, HealthResponse, PriceResponse, StatsResponse};
