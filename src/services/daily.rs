//! Daily protocol snapshots
//!
//! Once a day the protocol counters at the first block of the UTC day are
//! captured under `protocol-daily:<date>`, and the date is recorded as the
//! latest snapshot. Reads never compute: a day that was never captured
//! stays missing, and a captured day stays readable past its TTL.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use crate::cache::{CachedAccessor, TierTtl};
use crate::clock::Clock;
use crate::error::{CacheError, Result};
use crate::models::DailySnapshot;
use crate::services::keys;
use crate::upstream::MarketDataSource;

pub struct DailySnapshotService {
    accessor: Arc<CachedAccessor>,
    upstream: Arc<dyn MarketDataSource>,
    clock: Arc<dyn Clock>,
    ttl: TierTtl,
}

impl DailySnapshotService {
    pub fn new(
        accessor: Arc<CachedAccessor>,
        upstream: Arc<dyn MarketDataSource>,
        clock: Arc<dyn Clock>,
        ttl: TierTtl,
    ) -> Self {
        Self {
            accessor,
            upstream,
            clock,
            ttl,
        }
    }

    /// Current UTC date according to the service clock.
    pub fn today(&self) -> Result<NaiveDate> {
        DateTime::<Utc>::from_timestamp_millis(self.clock.now_ms() as i64)
            .map(|now| now.date_naive())
            .ok_or_else(|| CacheError::Internal("clock out of range".to_string()))
    }

    pub async fn cache_today(&self) -> Result<DailySnapshot> {
        let today = self.today()?;
        self.cache_daily_snapshot(today).await
    }

    pub async fn cache_daily_snapshot(&self, date: NaiveDate) -> Result<DailySnapshot> {
        let key = keys::protocol_daily(date);
        let snapshot: DailySnapshot = self
            .accessor
            .refresh(&key, self.ttl, || self.compute_snapshot(date))
            .await?;

        self.accessor
            .refresh(keys::PROTOCOL_DAILY_LATEST, self.ttl, || async {
                Ok::<_, CacheError>(date)
            })
            .await?;

        info!(%date, block = snapshot.block.number, "daily protocol snapshot cached");
        Ok(snapshot)
    }

    pub async fn daily_snapshot(&self, date: NaiveDate) -> Option<DailySnapshot> {
        self.accessor
            .peek_or_stale(&keys::protocol_daily(date), self.ttl)
            .await
    }

    pub async fn latest_snapshot(&self) -> Option<DailySnapshot> {
        let date: NaiveDate = self
            .accessor
            .peek_or_stale(keys::PROTOCOL_DAILY_LATEST, self.ttl)
            .await?;
        self.daily_snapshot(date).await
    }

    async fn compute_snapshot(&self, date: NaiveDate) -> Result<DailySnapshot> {
        let start_of_day = date
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc().timestamp())
            .ok_or_else(|| CacheError::Internal(format!("no midnight for {date}")))?;

        let block = self.upstream.fetch_block_at(start_of_day).await?;
        let snapshot = self
            .upstream
            .fetch_protocol_snapshot(Some(block.number))
            .await?;

        Ok(DailySnapshot {
            date,
            block,
            snapshot,
        })
    }
}
