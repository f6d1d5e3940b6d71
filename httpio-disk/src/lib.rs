//! # httpio-disk
//!
//! Persistent [`CacheStore`](httpio_backend::CacheStore) keeping one file per
//! cached response.
//!
//! - File names are the hex SHA-256 of the cache key with a `.cache` suffix
//! - Writes land in a temporary file first and are renamed into place
//! - The total size of entry files is kept under a byte budget by evicting
//!   the least recently accessed entries
//! - Expired entries are removed on read, by a periodic sweep and when the
//!   store is reopened

mod builder;
mod store;

pub use builder::{DEFAULT_CLEANUP_INTERVAL, DEFAULT_MAX_BYTES, DiskStoreBuilder};
pub use store::DiskStore;
