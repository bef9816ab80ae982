//! Request DTOs for the market cache API
//!
//! Query strings accepted by the read endpoints.

use serde::Deserialize;

use crate::error::{CacheError, Result};

/// Query for GET /token-prices
///
/// Without `at` the current prices are returned. With `at` (unix
/// milliseconds) each token's historical point closest to that instant
/// is returned instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PricesQuery {
    #[serde(default)]
    pub at: Option<i64>,
}

impl PricesQuery {
    /// Rejects timestamps before the unix epoch.
    pub fn validate(&self) -> Result<()> {
        match self.at {
            Some(at) if at < 0 => Err(CacheError::InvalidRequest(format!(
                "'at' must be a unix timestamp in milliseconds, got {}",
                at
            ))),
            _ => Ok(()),
        }
    }
}
