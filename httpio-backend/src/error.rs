//! Error types for cache store operations.

use bincode::error::{DecodeError, EncodeError};
use thiserror::Error;

/// Error returned by [`CacheStore`](crate::CacheStore) implementations.
///
/// The cache middleware never surfaces these to callers. A failed read is
/// treated as a miss and a failed write is logged and dropped.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An entry could not be serialized.
    #[error("Serialization error: {0}")]
    Encode(#[from] EncodeError),

    /// A stored entry could not be deserialized.
    #[error("Deserialization error: {0}")]
    Decode(#[from] DecodeError),

    /// A stored entry decoded but holds values that cannot be represented.
    #[error("Corrupt entry: {0}")]
    Corrupt(String),

    /// Eviction could not free enough room for a write.
    #[error("not enough space in cache: need {needed} bytes, budget is {budget} bytes")]
    InsufficientSpace {
        /// Size of the rejected entry.
        needed: u64,
        /// Configured byte budget.
        budget: u64,
    },

    /// The store has been closed.
    #[error("cache store is closed")]
    Closed,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
