//! Memory store capacity metrics.
//!
//! Enable the `metrics` feature to record them.
//!
//! - `httpio_memory_entries` - current number of entries (gauge)
//! - `httpio_memory_evictions_total` - entries evicted to make room (counter)
//!
//! Both carry a `store` label so several memory stores can be told apart.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Metric name for the entry count gauge.
    pub static ref MEMORY_ENTRIES: &'static str = {
        metrics::describe_gauge!(
            "httpio_memory_entries",
            "Current number of entries in the memory cache store."
        );
        "httpio_memory_entries"
    };

    /// Metric name for the eviction counter.
    pub static ref MEMORY_EVICTIONS: &'static str = {
        metrics::describe_counter!(
            "httpio_memory_evictions_total",
            "Entries evicted from the memory cache store to make room."
        );
        "httpio_memory_evictions_total"
    };
}

/// Records the current entry count.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_entries(store: &str, entries: usize) {
    metrics::gauge!(*MEMORY_ENTRIES, "store" => store.to_string()).set(entries as f64);
}

/// Records the current entry count (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_entries(_store: &str, _entries: usize) {}

/// Records a capacity eviction.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_eviction(store: &str) {
    metrics::counter!(*MEMORY_EVICTIONS, "store" => store.to_string()).increment(1);
}

/// Records a capacity eviction (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_eviction(_store: &str) {}
