//! Cache Module
//!
//! Two-tier caching: a per-process local tier (L1), a shared durable tier
//! (L2) and the get-or-compute accessor tying them together.

mod accessor;
mod durable;
mod entry;
mod http_store;
mod local;
mod lru;
mod stats;
mod tier;


// Re-export public types
pub use accessor::CachedAccessor;
pub use durable::MemoryDurableStore;
pub use entry::CacheEntry;
pub use http_store::HttpDurableStore;
pub use local::LocalStore;
pub use lru::LruTracker;
pub use stats::{AccessorCounters, CacheStats};
pub use tier::{TierStore, TierTtl};
