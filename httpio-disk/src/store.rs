use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use httpio_backend::{CacheEntry, CacheStore, StoreError, StoreResult};
use sha2::{Digest, Sha256};
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::builder::DiskStoreBuilder;

const ENTRY_SUFFIX: &str = ".cache";
const TEMP_SUFFIX: &str = ".tmp";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// File name used for `key`: hex SHA-256 of the key plus `.cache`.
pub(crate) fn file_name_for(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{}{}", hex::encode(digest), ENTRY_SUFFIX)
}

#[derive(Debug, Clone)]
struct IndexEntry {
    file_name: String,
    size: u64,
    last_accessed: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Index {
    entries: HashMap<String, IndexEntry>,
    current_size: u64,
}

impl Index {
    fn insert(&mut self, key: String, entry: IndexEntry) {
        self.current_size += entry.size;
        if let Some(old) = self.entries.insert(key, entry) {
            self.current_size = self.current_size.saturating_sub(old.size);
        }
    }

    fn remove(&mut self, key: &str) -> Option<IndexEntry> {
        let entry = self.entries.remove(key)?;
        self.current_size = self.current_size.saturating_sub(entry.size);
        Some(entry)
    }
}

/// Disk-backed cache store keeping one file per entry.
///
/// Use this when cached responses must survive restarts. For pure speed,
/// prefer `MemoryStore`.
///
/// ```no_run
/// use httpio_disk::DiskStore;
///
/// let store = DiskStore::builder()
///     .path("/var/cache/myapp")
///     .max_bytes(512 * 1024 * 1024)
///     .build()?;
/// # Ok::<(), httpio_backend::StoreError>(())
/// ```
///
/// Every write goes to a temporary file that is renamed over the entry file
/// once it is complete, so readers see either the old entry or the new one.
/// An in-memory index of key, file, size and access time is rebuilt from the
/// directory when the store is opened; corrupt, expired and leftover temporary
/// files are deleted during that scan.
///
/// Cloning is cheap; clones share the same directory and index.
#[derive(Clone)]
pub struct DiskStore {
    inner: Arc<Inner>,
}

struct Inner {
    dir: PathBuf,
    max_bytes: u64,
    index: Mutex<Index>,
    write_lock: Mutex<()>,
    closed: AtomicBool,
    shutdown: CancellationToken,
    label: String,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for DiskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskStore")
            .field("label", &self.inner.label)
            .field("dir", &self.inner.dir)
            .field("max_bytes", &self.inner.max_bytes)
            .finish()
    }
}

impl DiskStore {
    /// Starts building a new store.
    pub fn builder() -> DiskStoreBuilder {
        DiskStoreBuilder::default()
    }

    pub(crate) fn open(
        dir: PathBuf,
        max_bytes: u64,
        cleanup_interval: Option<Duration>,
        label: String,
    ) -> StoreResult<Self> {
        fs::create_dir_all(&dir)?;
        let inner = Arc::new(Inner {
            dir,
            max_bytes,
            index: Mutex::new(Index::default()),
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            label,
        });
        inner.load_index()?;
        if let Some(period) = cleanup_interval {
            spawn_sweeper(Arc::downgrade(&inner), inner.shutdown.clone(), period);
        }
        Ok(Self { inner })
    }

    /// Directory holding the entry files.
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.inner.index().entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total size of indexed entry files, in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.inner.index().current_size
    }

    /// Configured byte budget; zero means unbounded.
    pub fn max_bytes(&self) -> u64 {
        self.inner.max_bytes
    }

    /// Deletes every expired entry now, returning how many were removed.
    pub async fn purge_expired(&self) -> StoreResult<usize> {
        self.blocking(|inner| Ok(inner.sweep())).await
    }

    async fn blocking<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Inner) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.inner.ensure_open()?;
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| StoreError::Io(io::Error::other(e)))?
    }
}

impl Inner {
    fn index(&self) -> MutexGuard<'_, Index> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn path_of(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    fn remove_file(&self, file_name: &str) {
        if let Err(err) = fs::remove_file(self.path_of(file_name))
            && err.kind() != io::ErrorKind::NotFound
        {
            warn!(store = %self.label, file = file_name, error = %err, "failed to remove cache file");
        }
    }

    fn forget(&self, key: &str) {
        let removed = self.index().remove(key);
        if let Some(entry) = removed {
            self.remove_file(&entry.file_name);
        }
    }

    fn load_index(&self) -> StoreResult<()> {
        let now = Utc::now();
        let mut index = Index::default();
        let (mut corrupt, mut expired, mut temps) = (0usize, 0usize, 0usize);

        for dir_entry in fs::read_dir(&self.dir)? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_file() {
                continue;
            }
            let Ok(file_name) = dir_entry.file_name().into_string() else {
                continue;
            };
            let path = dir_entry.path();

            if file_name.ends_with(TEMP_SUFFIX) {
                let _ = fs::remove_file(&path);
                temps += 1;
                continue;
            }
            if !file_name.ends_with(ENTRY_SUFFIX) {
                continue;
            }

            let decoded = fs::read(&path).map_err(StoreError::from).and_then(|data| {
                let size = data.len() as u64;
                CacheEntry::decode(&data).map(|entry| (entry, size))
            });
            let (entry, size) = match decoded {
                Ok(decoded) => decoded,
                Err(err) => {
                    debug!(store = %self.label, file = %file_name, error = %err, "removing unreadable cache file");
                    let _ = fs::remove_file(&path);
                    corrupt += 1;
                    continue;
                }
            };

            if entry.is_expired_at(now) {
                let _ = fs::remove_file(&path);
                expired += 1;
                continue;
            }

            index.insert(
                entry.key,
                IndexEntry {
                    file_name,
                    size,
                    last_accessed: entry.last_accessed,
                    expires_at: entry.expires_at,
                },
            );
        }

        debug!(
            store = %self.label,
            entries = index.entries.len(),
            bytes = index.current_size,
            corrupt,
            expired,
            temps,
            "disk cache index rebuilt"
        );
        *self.index() = index;
        Ok(())
    }

    fn read(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        let file_name = {
            let index = self.index();
            match index.entries.get(key) {
                Some(meta) => meta.file_name.clone(),
                None => return Ok(None),
            }
        };

        let data = match fs::read(self.path_of(&file_name)) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.index().remove(key);
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let mut entry = match CacheEntry::decode(&data) {
            Ok(entry) if entry.key == key => entry,
            Ok(_) | Err(_) => {
                warn!(store = %self.label, key, "purging corrupt cache entry");
                self.forget(key);
                return Ok(None);
            }
        };

        if entry.is_expired() {
            trace!(store = %self.label, key, "dropped expired entry on read");
            self.forget(key);
            return Ok(None);
        }

        entry.touch();
        if let Some(meta) = self.index().entries.get_mut(key) {
            meta.last_accessed = entry.last_accessed;
        }
        Ok(Some(entry))
    }

    fn write(&self, key: &str, entry: CacheEntry) -> StoreResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.ensure_open()?;

        let data = entry.encode()?;
        let size = data.len() as u64;
        self.make_room(key, size)?;

        let file_name = file_name_for(key);
        let target = self.path_of(&file_name);
        let temp = self.path_of(&format!(
            ".{}.{}.{}{}",
            file_name,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed),
            TEMP_SUFFIX
        ));

        if let Err(err) = write_file(&temp, &data).and_then(|()| fs::rename(&temp, &target)) {
            let _ = fs::remove_file(&temp);
            return Err(err.into());
        }

        self.index().insert(
            key.to_owned(),
            IndexEntry {
                file_name,
                size,
                last_accessed: entry.last_accessed,
                expires_at: entry.expires_at,
            },
        );
        trace!(store = %self.label, key, size, "cache entry written");
        Ok(())
    }

    /// Evicts least recently accessed entries until `size` more bytes fit.
    fn make_room(&self, key: &str, size: u64) -> StoreResult<()> {
        if self.max_bytes == 0 {
            return Ok(());
        }
        let insufficient = StoreError::InsufficientSpace {
            needed: size,
            budget: self.max_bytes,
        };
        if size > self.max_bytes {
            return Err(insufficient);
        }

        let mut index = self.index();
        let replaced = index.entries.get(key).map_or(0, |meta| meta.size);
        let fits = |index: &Index| index.current_size - replaced + size <= self.max_bytes;
        if fits(&index) {
            return Ok(());
        }

        let mut candidates: Vec<(String, DateTime<Utc>)> = index
            .entries
            .iter()
            .filter(|(candidate, _)| candidate.as_str() != key)
            .map(|(candidate, meta)| (candidate.clone(), meta.last_accessed))
            .collect();
        candidates.sort_by_key(|(_, last_accessed)| *last_accessed);

        let mut evicted = 0usize;
        for (candidate, _) in candidates {
            if fits(&index) {
                break;
            }
            if let Some(meta) = index.remove(&candidate) {
                self.remove_file(&meta.file_name);
                evicted += 1;
            }
        }
        debug!(store = %self.label, evicted, "evicted entries to free space");

        if fits(&index) {
            Ok(())
        } else {
            Err(insufficient)
        }
    }

    fn clear(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut index = self.index();
        for meta in index.entries.values() {
            self.remove_file(&meta.file_name);
        }
        *index = Index::default();
        Ok(())
    }

    fn sweep(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<String> = self
            .index()
            .entries
            .iter()
            .filter(|(_, meta)| now >= meta.expires_at)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.forget(key);
        }
        expired.len()
    }
}

fn write_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

fn spawn_sweeper(inner: Weak<Inner>, shutdown: CancellationToken, period: Duration) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        debug!("no tokio runtime, disk store sweep disabled");
        return;
    };
    handle.spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(inner) = inner.upgrade() else { break };
                    match tokio::task::spawn_blocking(move || {
                        let removed = inner.sweep();
                        (removed, inner)
                    })
                    .await
                    {
                        Ok((removed, inner)) if removed > 0 => {
                            debug!(store = %inner.label, removed, "swept expired entries");
                        }
                        Ok(_) => {}
                        Err(err) => warn!(error = %err, "disk store sweep failed"),
                    }
                }
            }
        }
        trace!("disk store sweep stopped");
    });
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn get(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        let key = key.to_owned();
        self.blocking(move |inner| inner.read(&key)).await
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> StoreResult<()> {
        let key = key.to_owned();
        self.blocking(move |inner| inner.write(&key, entry)).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let key = key.to_owned();
        self.blocking(move |inner| {
            inner.forget(&key);
            Ok(())
        })
        .await
    }

    async fn clear(&self) -> StoreResult<()> {
        self.blocking(|inner| inner.clear()).await
    }

    async fn close(&self) -> StoreResult<()> {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            self.inner.shutdown.cancel();
            debug!(store = %self.inner.label, "disk store closed");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.inner.label
    }
}
