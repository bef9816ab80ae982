//! Market Cache - a two-tier cache in front of slow market data upstreams
//!
//! Binary entry point: wires the tiers, services and refresh jobs together
//! and serves the REST API until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use market_cache::api::{create_router, AppState};
use market_cache::cache::{
    CachedAccessor, HttpDurableStore, LocalStore, MemoryDurableStore, TierStore,
};
use market_cache::clock::{Clock, SystemClock};
use market_cache::config::Config;
use market_cache::services::Services;
use market_cache::tasks::{
    register_refresh_jobs, spawn_cleanup_task, JobIntervals, RefreshScheduler,
};
use market_cache::upstream::{HttpMarketData, MarketDataSource};

/// Time given to running jobs to finish at shutdown.
const JOB_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Main entry point for the market cache service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Build the local and durable tiers and the cached accessor
/// 4. Build the upstream client and the data services
/// 5. Register refresh jobs and start the local cleanup task
/// 6. Serve the REST API until a shutdown signal arrives
/// 7. Stop jobs, abort cleanup, close the durable tier
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting market cache");

    let config = Config::from_env();
    config.validate().context("invalid configuration")?;
    let ttls = config.cache_ttls()?;
    info!(
        port = config.server_port,
        local_max_entries = config.local_max_entries,
        durable_store = config.durable_store_url.as_deref().unwrap_or("in-process"),
        upstream = %config.upstream_url,
        "Configuration loaded"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let local = Arc::new(LocalStore::new(config.local_max_entries, clock.clone()));
    let durable: Arc<dyn TierStore> = match config.durable_store_url.as_deref() {
        Some(url) => Arc::new(
            HttpDurableStore::new(
                url,
                config.durable_store_timeout(),
                clock.clone(),
                config.stale_retention(),
            )
            .context("failed to build durable store client")?,
        ),
        None => Arc::new(MemoryDurableStore::new(
            clock.clone(),
            config.stale_retention(),
        )),
    };
    info!(durable = durable.name(), "Cache tiers initialized");

    let accessor = Arc::new(CachedAccessor::new(
        local.clone(),
        durable,
        config.compute_timeout(),
    ));

    let upstream: Arc<dyn MarketDataSource> = Arc::new(
        HttpMarketData::new(&config.upstream_url, config.upstream_timeout())
            .context("failed to build upstream client")?,
    );
    let services = Services::new(
        accessor.clone(),
        upstream,
        clock,
        ttls,
        config.governance_token_pool_id.clone(),
    );

    let scheduler = Arc::new(RefreshScheduler::new());
    register_refresh_jobs(
        &scheduler,
        Arc::new(services.clone()),
        &JobIntervals::default(),
        config.daily_retry_policy()?,
    )
    .context("failed to register refresh jobs")?;
    info!(jobs = scheduler.job_count(), "Refresh jobs started");

    let cleanup_handle = spawn_cleanup_task(local, config.cleanup_interval());
    info!("Background cleanup task started");

    let app = create_router(AppState::new(
        services,
        accessor.clone(),
        scheduler.clone(),
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    scheduler.shutdown(JOB_SHUTDOWN_GRACE).await;
    cleanup_handle.abort();
    accessor.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
