//! Resilience metrics.
//!
//! Enable the `metrics` feature to record them.
//!
//! - `httpio_circuit_breaker_transitions_total` - state changes, labelled by breaker and target state
//! - `httpio_circuit_breaker_rejections_total` - requests refused without reaching the transport
//! - `httpio_retry_attempts_total` - retries issued, labelled by the reason for the retry

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

use crate::circuit_breaker::CircuitState;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Metric name for breaker state transitions.
    pub static ref BREAKER_TRANSITIONS: &'static str = {
        metrics::describe_counter!(
            "httpio_circuit_breaker_transitions_total",
            "Circuit breaker state transitions."
        );
        "httpio_circuit_breaker_transitions_total"
    };

    /// Metric name for breaker rejections.
    pub static ref BREAKER_REJECTIONS: &'static str = {
        metrics::describe_counter!(
            "httpio_circuit_breaker_rejections_total",
            "Requests rejected by an open or saturated circuit breaker."
        );
        "httpio_circuit_breaker_rejections_total"
    };

    /// Metric name for retry attempts.
    pub static ref RETRY_ATTEMPTS: &'static str = {
        metrics::describe_counter!(
            "httpio_retry_attempts_total",
            "Retries issued by the retry middleware."
        );
        "httpio_retry_attempts_total"
    };
}

/// Records a breaker state transition.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_transition(breaker: &str, to: CircuitState) {
    metrics::counter!(
        *BREAKER_TRANSITIONS,
        "breaker" => breaker.to_string(),
        "state" => to.as_str()
    )
    .increment(1);
}

/// Records a breaker state transition (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_transition(_breaker: &str, _to: CircuitState) {}

/// Records a rejected request.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_rejection(breaker: &str) {
    metrics::counter!(*BREAKER_REJECTIONS, "breaker" => breaker.to_string()).increment(1);
}

/// Records a rejected request (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_rejection(_breaker: &str) {}

/// Records a retry. `reason` is `"error"` or `"status"`.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_retry_attempt(reason: &'static str) {
    metrics::counter!(*RETRY_ATTEMPTS, "reason" => reason).increment(1);
}

/// Records a retry (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_retry_attempt(_reason: &'static str) {}
