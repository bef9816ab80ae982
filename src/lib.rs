//! Market Cache - a two-tier cache in front of slow market data upstreams
//!
//! Serves pools, farms, token prices and protocol statistics from a local
//! LRU tier backed by a shared durable tier, kept warm by scheduled
//! refresh jobs and falling back to stale values when an upstream fails.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod tasks;
pub mod upstream;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_cleanup_task;
