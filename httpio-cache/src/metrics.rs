//! Cache metrics.
//!
//! Enable the `metrics` feature to record them.
//!
//! - `httpio_cache_hit_total` - requests answered from the store
//! - `httpio_cache_miss_total` - cacheable requests sent upstream
//! - `httpio_cache_stale_total` - stored entries found stale or bypassed and removed
//! - `httpio_cache_write_error_total` - background writes the store refused

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Metric name for cache hits.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!("httpio_cache_hit_total", "Total number of cache hits.");
        "httpio_cache_hit_total"
    };
    /// Metric name for cache misses.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!("httpio_cache_miss_total", "Total number of cache misses.");
        "httpio_cache_miss_total"
    };
    /// Metric name for stale entries.
    pub static ref CACHE_STALE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "httpio_cache_stale_total",
            "Total number of stale entries removed on lookup."
        );
        "httpio_cache_stale_total"
    };
    /// Metric name for failed writes.
    pub static ref CACHE_WRITE_ERROR_COUNTER: &'static str = {
        metrics::describe_counter!(
            "httpio_cache_write_error_total",
            "Total number of failed background cache writes."
        );
        "httpio_cache_write_error_total"
    };
}

/// Lookup outcome recorded per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Served from the store.
    Hit,
    /// Sent upstream.
    Miss,
    /// A stored entry was stale or bypassed.
    Stale,
}

/// Records a lookup outcome.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_lookup(store: &str, lookup: Lookup) {
    let name = match lookup {
        Lookup::Hit => *CACHE_HIT_COUNTER,
        Lookup::Miss => *CACHE_MISS_COUNTER,
        Lookup::Stale => *CACHE_STALE_COUNTER,
    };
    metrics::counter!(name, "store" => store.to_string()).increment(1);
}

/// Records a lookup outcome (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_lookup(_store: &str, _lookup: Lookup) {}

/// Records a failed background write.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_write_error(store: &str) {
    metrics::counter!(*CACHE_WRITE_ERROR_COUNTER, "store" => store.to_string()).increment(1);
}

/// Records a failed background write (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_write_error(_store: &str) {}
