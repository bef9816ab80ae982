//! Local Tier Cleanup Task
//!
//! Background task that periodically drops expired entries from the local
//! tier. Stale fallback reads only from the durable tier, so expired local
//! entries are dead weight.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::LocalStore;

/// Spawns the sweep loop. The returned handle is aborted at shutdown.
pub fn spawn_cleanup_task(local: Arc<LocalStore>, cleanup_interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_secs = cleanup_interval.as_secs(),
            "starting local tier cleanup task"
        );

        loop {
            tokio::time::sleep(cleanup_interval).await;

            let removed = local.purge_expired();
            if removed > 0 {
                info!(removed, remaining = local.len(), "local tier cleanup");
            } else {
                debug!("local tier cleanup: nothing expired");
            }
        }
    })
}
