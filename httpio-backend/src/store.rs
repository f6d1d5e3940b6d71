use std::sync::Arc;

use async_trait::async_trait;

use crate::{CacheEntry, StoreResult};

/// Storage for cached responses.
///
/// Implementations must be safe for concurrent use. Reads hand out copies so
/// callers cannot change what is stored; an expired entry is never returned
/// and is removed when it is found.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Looks up a fresh entry, updating its access time.
    async fn get(&self, key: &str) -> StoreResult<Option<CacheEntry>>;

    /// Stores `entry` under `key`, replacing any previous entry.
    async fn set(&self, key: &str, entry: CacheEntry) -> StoreResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Removes every entry.
    async fn clear(&self) -> StoreResult<()>;

    /// Stops background maintenance and releases resources.
    ///
    /// Operations after `close` fail with [`StoreError::Closed`](crate::StoreError::Closed).
    async fn close(&self) -> StoreResult<()>;

    /// Short name used in logs and metrics labels.
    fn name(&self) -> &str {
        "store"
    }
}

#[async_trait]
impl CacheStore for &dyn CacheStore {
    async fn get(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        (*self).get(key).await
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> StoreResult<()> {
        (*self).set(key, entry).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        (*self).delete(key).await
    }

    async fn clear(&self) -> StoreResult<()> {
        (*self).clear().await
    }

    async fn close(&self) -> StoreResult<()> {
        (*self).close().await
    }

    fn name(&self) -> &str {
        (*self).name()
    }
}

#[async_trait]
impl CacheStore for Box<dyn CacheStore> {
    async fn get(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> StoreResult<()> {
        (**self).set(key, entry).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key).await
    }

    async fn clear(&self) -> StoreResult<()> {
        (**self).clear().await
    }

    async fn close(&self) -> StoreResult<()> {
        (**self).close().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl CacheStore for Arc<dyn CacheStore> {
    async fn get(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> StoreResult<()> {
        (**self).set(key, entry).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key).await
    }

    async fn clear(&self) -> StoreResult<()> {
        (**self).clear().await
    }

    async fn close(&self) -> StoreResult<()> {
        (**self).close().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
