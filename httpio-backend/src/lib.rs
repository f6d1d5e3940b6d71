#![warn(missing_docs)]
//! # httpio-backend
//!
//! The storage side of the httpio response cache.
//!
//! - [`CacheStore`] - async trait every cache backend implements
//! - [`CacheEntry`] - a cached response with its access and expiry times
//! - [`StoreError`] - failures reported by stores
//!
//! Persistent stores serialize entries with [`CacheEntry::encode`] and read
//! them back with [`CacheEntry::decode`] (bincode under the hood).

mod entry;
mod error;
mod store;

pub use entry::CacheEntry;
pub use error::{StoreError, StoreResult};
pub use store::CacheStore;
