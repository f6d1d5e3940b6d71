//! Builder for configuring [`MemoryStore`].

use std::time::Duration;

use crate::store::MemoryStore;

/// Default maximum number of entries.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default interval between expiry sweeps.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Builder for creating and configuring a [`MemoryStore`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use httpio_memory::MemoryStore;
///
/// let store = MemoryStore::builder()
///     .capacity(1_000)
///     .cleanup_interval(Duration::from_secs(60))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStoreBuilder {
    capacity: usize,
    cleanup_interval: Option<Duration>,
    label: String,
}

impl Default for MemoryStoreBuilder {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            cleanup_interval: Some(DEFAULT_CLEANUP_INTERVAL),
            label: "memory".to_owned(),
        }
    }
}

impl MemoryStoreBuilder {
    /// Maximum number of entries. Zero falls back to [`DEFAULT_CAPACITY`].
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = if capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            capacity
        };
        self
    }

    /// Interval of the background expiry sweep. A zero duration disables it.
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Disables the background expiry sweep. Expired entries are still
    /// dropped when they are read.
    pub fn without_cleanup(mut self) -> Self {
        self.cleanup_interval = None;
        self
    }

    /// Label used in logs and metrics.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Builds the store.
    ///
    /// The sweep task is only started when a Tokio runtime is available.
    pub fn build(self) -> MemoryStore {
        MemoryStore::new(self.capacity, self.cleanup_interval, self.label)
    }
}
