#![warn(missing_docs)]
//! # httpio-cache
//!
//! Response cache middleware for the httpio pipeline.
//!
//! [`CacheMiddleware`] stores GET and HEAD responses in any
//! [`CacheStore`](httpio_backend::CacheStore) and replays them while they are
//! fresh. Freshness comes from `Cache-Control: max-age`, then `Expires`, then
//! the configured path, domain and default lifetimes.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use httpio_cache::{CacheConfig, CacheMiddleware, KeyStrategy};
//! use httpio_memory::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::builder().capacity(500).build());
//! let cache = CacheMiddleware::new(
//!     store,
//!     CacheConfig::new()
//!         .with_default_ttl(Duration::from_secs(60))
//!         .with_key_strategy(KeyStrategy::UrlOnly)
//!         .with_exclude_patterns(["/login"]),
//! )?;
//! ```
//!
//! ## Feature Flags
//!
//! - `metrics` - count hits, misses, stale entries and failed writes

mod config;
mod error;
pub mod freshness;
mod key;
pub mod metrics;
mod middleware;
mod pattern;

pub use config::{
    CacheConfig, DEFAULT_CLEANUP_INTERVAL, DEFAULT_STATUS_HEADER, DEFAULT_TTL, TtlRule,
};
pub use error::ConfigError;
pub use key::{KeyStrategy, MAX_HASHED_BODY};
pub use middleware::CacheMiddleware;
pub use pattern::UrlPattern;
