//! Memory store implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use httpio_backend::{CacheEntry, CacheStore, StoreError, StoreResult};
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::builder::MemoryStoreBuilder;
use crate::lru::Lru;
use crate::metrics;

/// Bounded in-memory cache store with least-recently-used eviction.
///
/// Reads promote the entry and return a copy. Expired entries are dropped
/// when they are read and by an optional background sweep that stops when the
/// store is closed or dropped.
///
/// # Examples
///
/// ```
/// use httpio_memory::MemoryStore;
///
/// let store = MemoryStore::builder().capacity(500).build();
/// assert_eq!(store.capacity(), 500);
/// ```
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    lru: Mutex<Lru>,
    closed: AtomicBool,
    shutdown: CancellationToken,
    label: String,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Lru> {
        self.lru.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn sweep(&self) -> usize {
        let mut lru = self.lock();
        let removed = lru.remove_expired(Utc::now());
        metrics::record_entries(&self.label, lru.len());
        removed
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("label", &self.inner.label)
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStoreBuilder::default().build()
    }
}

impl MemoryStore {
    /// Starts building a new store.
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::default()
    }

    pub(crate) fn new(capacity: usize, cleanup_interval: Option<Duration>, label: String) -> Self {
        let inner = Arc::new(Inner {
            lru: Mutex::new(Lru::new(capacity)),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            label,
        });
        if let Some(period) = cleanup_interval {
            spawn_sweeper(Arc::downgrade(&inner), inner.shutdown.clone(), period);
        }
        Self { inner }
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Removes every expired entry now, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.inner.sweep()
    }
}

fn spawn_sweeper(inner: Weak<Inner>, shutdown: CancellationToken, period: Duration) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        debug!("no tokio runtime, memory store sweep disabled");
        return;
    };
    handle.spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(inner) = inner.upgrade() else { break };
                    let removed = inner.sweep();
                    if removed > 0 {
                        debug!(store = %inner.label, removed, "swept expired entries");
                    }
                }
            }
        }
        trace!("memory store sweep stopped");
    });
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        self.inner.ensure_open()?;
        let mut lru = self.inner.lock();
        let Some(entry) = lru.get_mut(key) else {
            return Ok(None);
        };
        if entry.is_expired() {
            lru.remove(key);
            trace!(store = %self.inner.label, key, "dropped expired entry on read");
            return Ok(None);
        }
        entry.touch();
        Ok(Some(entry.clone()))
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> StoreResult<()> {
        self.inner.ensure_open()?;
        let mut lru = self.inner.lock();
        if let Some(evicted) = lru.insert(key.to_owned(), entry) {
            trace!(store = %self.inner.label, evicted = %evicted.key, "evicted least recently used entry");
            metrics::record_eviction(&self.inner.label);
        }
        metrics::record_entries(&self.inner.label, lru.len());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.ensure_open()?;
        self.inner.lock().remove(key);
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        self.inner.ensure_open()?;
        self.inner.lock().clear();
        metrics::record_entries(&self.inner.label, 0);
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.shutdown.cancel();
        self.inner.lock().clear();
        debug!(store = %self.inner.label, "memory store closed");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.inner.label
    }
}
