//! Cache keys shared by services, jobs and the API.

use chrono::NaiveDate;

pub const POOLS: &str = "pools";
/// Pools as of the block from 24h ago
pub const PAST_POOLS: &str = "past-pools";
pub const PORTFOLIO_POOLS: &str = "portfolio-pools";
pub const POOL_CONFIG: &str = "pool-config";
pub const TOKEN_PRICES: &str = "token-prices";
pub const TOKEN_HISTORICAL_PRICES: &str = "token-historical-prices";
pub const TOKEN_DEFINITIONS: &str = "token-definitions";
pub const BLOCK_FROM_24H_AGO: &str = "block-from-24h-ago";
pub const AVERAGE_BLOCK_TIME: &str = "average-block-time";
pub const PROTOCOL_DATA: &str = "protocol-data";
pub const CIRCULATING_SUPPLY: &str = "circulating-supply";
pub const FARMS: &str = "farms";
pub const FARM_USERS: &str = "farm-users";
/// Date of the most recent daily snapshot
pub const PROTOCOL_DAILY_LATEST: &str = "protocol-daily:latest";

pub fn protocol_daily(date: NaiveDate) -> String {
    format!("protocol-daily:{}", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_daily_key() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(protocol_daily(date), "protocol-daily:2024-03-07");
    }
}
