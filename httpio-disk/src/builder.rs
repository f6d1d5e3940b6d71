use std::path::{Path, PathBuf};
use std::time::Duration;

use httpio_backend::StoreResult;

use crate::DiskStore;

/// Default byte budget: 100 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 100 * 1024 * 1024;

/// Default interval between expiry sweeps.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Builder for [`DiskStore`].
///
/// ```no_run
/// use std::time::Duration;
/// use httpio_disk::DiskStore;
///
/// let store = DiskStore::builder()
///     .path("/var/cache/myapp")
///     .max_size_mb(256)
///     .cleanup_interval(Duration::from_secs(600))
///     .build()?;
/// # Ok::<(), httpio_backend::StoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DiskStoreBuilder {
    path: Option<PathBuf>,
    max_bytes: u64,
    cleanup_interval: Option<Duration>,
    label: String,
}

impl Default for DiskStoreBuilder {
    fn default() -> Self {
        Self {
            path: None,
            max_bytes: DEFAULT_MAX_BYTES,
            cleanup_interval: Some(DEFAULT_CLEANUP_INTERVAL),
            label: "disk".to_owned(),
        }
    }
}

impl DiskStoreBuilder {
    /// Directory holding the entry files. Created if missing.
    ///
    /// Defaults to `httpio-cache` under the system temporary directory.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Caps the total size of entry files. Zero disables the cap.
    pub fn max_bytes(mut self, bytes: u64) -> Self {
        self.max_bytes = bytes;
        self
    }

    /// Same as [`max_bytes`](Self::max_bytes), in mebibytes.
    pub fn max_size_mb(self, megabytes: u64) -> Self {
        self.max_bytes(megabytes.saturating_mul(1024 * 1024))
    }

    /// Interval of the background expiry sweep. A zero duration disables it.
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Disables the background expiry sweep.
    pub fn without_cleanup(mut self) -> Self {
        self.cleanup_interval = None;
        self
    }

    /// Identifies this store in logs.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Opens the store, rebuilding the index from the directory.
    ///
    /// Fails if the directory cannot be created or listed.
    pub fn build(self) -> StoreResult<DiskStore> {
        let dir = self
            .path
            .unwrap_or_else(|| std::env::temp_dir().join("httpio-cache"));
        DiskStore::open(dir, self.max_bytes, self.cleanup_interval, self.label)
    }
}
