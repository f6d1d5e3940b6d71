#![warn(missing_docs)]
//! # httpio-memory
//!
//! In-memory [`CacheStore`](httpio_backend::CacheStore) for the httpio
//! response cache.
//!
//! [`MemoryStore`] holds at most `capacity` entries and evicts the least
//! recently used one when a new key arrives at a full store. Expired entries
//! are dropped lazily on read and by a periodic background sweep.
//!
//! ## Feature Flags
//!
//! - `metrics` - record entry count and eviction metrics

mod builder;
mod lru;
pub mod metrics;
mod store;

pub use builder::{DEFAULT_CAPACITY, DEFAULT_CLEANUP_INTERVAL, MemoryStoreBuilder};
pub use store::MemoryStore;
