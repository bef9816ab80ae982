//! Response DTOs for the market cache API
//!
//! Defines the structure of outgoing HTTP response bodies that are not
//! domain models themselves.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Accessor counters plus local tier occupancy
    pub cache: CacheStats,
    /// (l1 hits + l2 hits) / lookups
    pub hit_rate: f64,
    /// Name of the durable tier backend in use
    pub durable_store: String,
}

impl StatsResponse {
    pub fn new(cache: CacheStats, durable_store: impl Into<String>) -> Self {
        Self {
            hit_rate: cache.hit_rate(),
            cache,
            durable_store: durable_store.into(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Single token price (GET /token-prices/:address)
#[derive(Debug, Clone, Serialize)]
pub struct PriceResponse {
    pub address: String,
    pub usd: f64,
}

impl PriceResponse {
    pub fn new(address: impl Into<String>, usd: f64) -> Self {
        Self {
            address: address.into(),
            usd,
        }
    }
}

/// Response body for GET /circulating-supply
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CirculatingSupplyResponse {
    pub circulating_supply: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_response_carries_hit_rate() {
        let cache = CacheStats {
            l1_hits: 6,
            l2_hits: 2,
            misses: 2,
            ..CacheStats::default()
        };
        let resp = StatsResponse::new(cache, "memory-durable");
        assert!((resp.hit_rate - 0.8).abs() < 0.001);

        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"durable_store\":\"memory-durable\""));
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::new(CacheStats::default(), "local");
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_circulating_supply_wire_name() {
        let resp = CirculatingSupplyResponse {
            circulating_supply: 12.5,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"circulatingSupply":12.5}"#);
    }
}
