//! Circuit breaker configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use httpio_core::{Response, Result};

use super::CircuitState;

/// Decides whether an outcome counts as a failure.
pub type FailurePredicate = Arc<dyn Fn(&Result<Response>) -> bool + Send + Sync>;

/// Called with `(from, to)` on every state change.
pub type StateObserver = Arc<dyn Fn(CircuitState, CircuitState) + Send + Sync>;

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    /// Consecutive failures that open the circuit.
    pub const FAILURE_THRESHOLD: u32 = 5;

    /// Time the circuit stays open before probing.
    pub const RECOVERY_TIMEOUT: Duration = Duration::from_secs(60);

    /// Probe requests admitted while half-open.
    pub const HALF_OPEN_MAX_CALLS: u32 = 3;
}

/// Counts any error, or any response with a 5xx status, as a failure.
pub fn default_failure_predicate(outcome: &Result<Response>) -> bool {
    match outcome {
        Err(_) => true,
        Ok(response) => response.status().is_server_error(),
    }
}

/// Configuration for a circuit breaker.
#[derive(Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit.
    pub failure_threshold: u32,

    /// How long to stay open after the last failure before probing.
    pub recovery_timeout: Duration,

    /// Maximum number of probes admitted while half-open.
    pub half_open_max_calls: u32,

    /// Failure classification. `None` uses [`default_failure_predicate`].
    pub failure_predicate: Option<FailurePredicate>,

    /// State change observer, invoked after the state lock is released.
    pub on_state_change: Option<StateObserver>,

    /// Name used in logs and metrics.
    pub name: String,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: defaults::FAILURE_THRESHOLD,
            recovery_timeout: defaults::RECOVERY_TIMEOUT,
            half_open_max_calls: defaults::HALF_OPEN_MAX_CALLS,
            failure_predicate: None,
            on_state_change: None,
            name: "default".to_owned(),
        }
    }
}

impl fmt::Debug for CircuitBreakerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("failure_threshold", &self.failure_threshold)
            .field("recovery_timeout", &self.recovery_timeout)
            .field("half_open_max_calls", &self.half_open_max_calls)
            .field("failure_predicate", &self.failure_predicate.is_some())
            .field("on_state_change", &self.on_state_change.is_some())
            .field("name", &self.name)
            .finish()
    }
}

impl CircuitBreakerConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure threshold.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the recovery timeout.
    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    /// Sets the half-open probe budget.
    pub fn with_half_open_max_calls(mut self, max: u32) -> Self {
        self.half_open_max_calls = max;
        self
    }

    /// Sets the failure classification.
    pub fn with_failure_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Result<Response>) -> bool + Send + Sync + 'static,
    {
        self.failure_predicate = Some(Arc::new(predicate));
        self
    }

    /// Sets the state change observer.
    pub fn with_on_state_change<F>(mut self, observer: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.on_state_change = Some(Arc::new(observer));
        self
    }

    /// Sets the name used in logs and metrics.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces zero values with defaults.
    pub(crate) fn normalized(mut self) -> Self {
        if self.failure_threshold == 0 {
            self.failure_threshold = defaults::FAILURE_THRESHOLD;
        }
        if self.recovery_timeout.is_zero() {
            self.recovery_timeout = defaults::RECOVERY_TIMEOUT;
        }
        if self.half_open_max_calls == 0 {
            self.half_open_max_calls = defaults::HALF_OPEN_MAX_CALLS;
        }
        self
    }

    pub(crate) fn is_failure(&self, outcome: &Result<Response>) -> bool {
        match &self.failure_predicate {
            Some(predicate) => predicate(outcome),
            None => default_failure_predicate(outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use httpio_core::{Body, Error};

    fn response(status: StatusCode) -> Result<Response> {
        let mut res = Response::new(Body::empty());
        *res.status_mut() = status;
        Ok(res)
    }

    #[test]
    fn default_predicate_counts_errors_and_5xx() {
        assert!(default_failure_predicate(&Err(Error::transport("refused"))));
        assert!(default_failure_predicate(&response(StatusCode::BAD_GATEWAY)));
        assert!(!default_failure_predicate(&response(StatusCode::NOT_FOUND)));
        assert!(!default_failure_predicate(&response(StatusCode::OK)));
    }

    #[test]
    fn zero_values_fall_back_to_defaults() {
        let config = CircuitBreakerConfig::new()
            .with_failure_threshold(0)
            .with_recovery_timeout(Duration::ZERO)
            .with_half_open_max_calls(0)
            .normalized();
        assert_eq!(config.failure_threshold, defaults::FAILURE_THRESHOLD);
        assert_eq!(config.recovery_timeout, defaults::RECOVERY_TIMEOUT);
        assert_eq!(config.half_open_max_calls, defaults::HALF_OPEN_MAX_CALLS);
    }
}
