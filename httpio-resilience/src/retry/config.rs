//! Retry configuration and backoff calculation.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use httpio_core::{Error, Response, Result};

/// Decides whether an error is worth another attempt.
pub type ErrorPredicate = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    use http::StatusCode;

    /// Additional attempts after the first one.
    pub const MAX_RETRIES: u32 = 3;

    /// Delay before the first retry.
    pub const BASE_DELAY: Duration = Duration::from_millis(100);

    /// Upper bound for any delay.
    pub const MAX_DELAY: Duration = Duration::from_secs(10);

    /// No jitter.
    pub const JITTER_FACTOR: f64 = 0.0;

    /// Statuses that trigger a retry.
    pub const RETRYABLE_STATUS_CODES: [StatusCode; 5] = [
        StatusCode::REQUEST_TIMEOUT,
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::BAD_GATEWAY,
        StatusCode::SERVICE_UNAVAILABLE,
        StatusCode::GATEWAY_TIMEOUT,
    ];
}

/// Configuration for retry behavior.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `base_delay`: 100 milliseconds
/// - `max_delay`: 10 seconds
/// - `jitter_factor`: 0.0
/// - `retryable_status_codes`: 408, 500, 502, 503, 504
/// - `error_predicate`: every error is retryable
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use httpio_resilience::retry::RetryConfig;
///
/// let config = RetryConfig::new()
///     .with_max_retries(5)
///     .with_base_delay(Duration::from_millis(50))
///     .with_jitter_factor(0.2);
/// assert_eq!(config.max_retries, 5);
/// ```
#[derive(Clone)]
pub struct RetryConfig {
    /// Maximum number of retries, not counting the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry; doubled for every further one.
    pub base_delay: Duration,

    /// Cap for every delay, jitter included. Zero disables the cap.
    pub max_delay: Duration,

    /// Relative jitter between 0.0 and 1.0. `0.2` spreads delays by +/- 20%.
    pub jitter_factor: f64,

    /// Response statuses that trigger a retry.
    pub retryable_status_codes: HashSet<StatusCode>,

    /// Error classification. `None` retries every error.
    pub error_predicate: Option<ErrorPredicate>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: defaults::MAX_RETRIES,
            base_delay: defaults::BASE_DELAY,
            max_delay: defaults::MAX_DELAY,
            jitter_factor: defaults::JITTER_FACTOR,
            retryable_status_codes: defaults::RETRYABLE_STATUS_CODES.into_iter().collect(),
            error_predicate: None,
        }
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<u16> = self
            .retryable_status_codes
            .iter()
            .map(StatusCode::as_u16)
            .collect();
        codes.sort_unstable();
        f.debug_struct("RetryConfig")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("jitter_factor", &self.jitter_factor)
            .field("retryable_status_codes", &codes)
            .field("error_predicate", &self.error_predicate.is_some())
            .finish()
    }
}

impl RetryConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Sets the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the delay before the first retry.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the jitter factor, clamped to `0.0..=1.0`.
    pub fn with_jitter_factor(mut self, jitter: f64) -> Self {
        self.jitter_factor = if jitter.is_finite() {
            jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// Replaces the set of retryable statuses.
    pub fn with_retryable_status_codes<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = StatusCode>,
    {
        self.retryable_status_codes = codes.into_iter().collect();
        self
    }

    /// Sets the error classification.
    pub fn with_error_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        self.error_predicate = Some(Arc::new(predicate));
        self
    }

    /// Whether `outcome` should be retried.
    ///
    /// Errors go through the error predicate; responses are retried only when
    /// their status is in the retryable set.
    pub fn is_retryable(&self, outcome: &Result<Response>) -> bool {
        match outcome {
            Err(err) => self
                .error_predicate
                .as_ref()
                .is_none_or(|predicate| predicate(err)),
            Ok(response) => self.retryable_status_codes.contains(&response.status()),
        }
    }

    /// Delay before retry number `attempt` (zero-based), without jitter.
    ///
    /// `min(max_delay, base_delay * 2^attempt)`.
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let delay = self.base_delay.saturating_mul(factor);
        self.cap(delay)
    }

    /// Delay before retry number `attempt` (zero-based), jitter applied.
    ///
    /// The result never exceeds `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let delay = self.base_backoff(attempt);
        if self.jitter_factor <= 0.0 {
            return delay;
        }
        let secs = delay.as_secs_f64();
        let spread = secs * self.jitter_factor * (2.0 * rand::random::<f64>() - 1.0);
        let jittered = Duration::try_from_secs_f64((secs + spread).max(0.0)).unwrap_or(delay);
        self.cap(jittered)
    }

    fn cap(&self, delay: Duration) -> Duration {
        if self.max_delay.is_zero() {
            delay
        } else {
            delay.min(self.max_delay)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpio_core::Body;

    fn response(status: StatusCode) -> Result<Response> {
        let mut res = Response::new(Body::empty());
        *res.status_mut() = status;
        Ok(res)
    }

    #[test]
    fn test_backoff_doubles_until_capped() {
        let config = RetryConfig::new()
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(500));

        assert_eq!(config.backoff(0), Duration::from_millis(100));
        assert_eq!(config.backoff(1), Duration::from_millis(200));
        assert_eq!(config.backoff(2), Duration::from_millis(400));
        assert_eq!(config.backoff(3), Duration::from_millis(500));
        assert_eq!(config.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_is_monotonic_without_jitter() {
        let config = RetryConfig::default();
        let delays: Vec<Duration> = (0..20).map(|n| config.backoff(n)).collect();
        assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(delays.iter().all(|d| *d <= config.max_delay));
    }

    #[test]
    fn test_jitter_never_exceeds_max_delay() {
        let config = RetryConfig::new()
            .with_base_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(3))
            .with_jitter_factor(1.0);
        for attempt in 0..10 {
            for _ in 0..50 {
                assert!(config.backoff(attempt) <= Duration::from_secs(3));
            }
        }
    }

    #[test]
    fn test_jitter_stays_within_factor() {
        let config = RetryConfig::new()
            .with_base_delay(Duration::from_millis(1000))
            .with_max_delay(Duration::ZERO)
            .with_jitter_factor(0.2);
        for _ in 0..100 {
            let delay = config.backoff(0);
            assert!(delay >= Duration::from_millis(800));
            assert!(delay <= Duration::from_millis(1200));
        }
    }

    #[test]
    fn test_retryable_classification() {
        let config = RetryConfig::default();
        assert!(config.is_retryable(&response(StatusCode::SERVICE_UNAVAILABLE)));
        assert!(config.is_retryable(&response(StatusCode::REQUEST_TIMEOUT)));
        assert!(!config.is_retryable(&response(StatusCode::NOT_IMPLEMENTED)));
        assert!(!config.is_retryable(&response(StatusCode::OK)));
        assert!(config.is_retryable(&Err(Error::transport("reset"))));

        let strict = config.with_error_predicate(|err| !err.is_circuit_open());
        assert!(!strict.is_retryable(&Err(httpio_core::CircuitOpenError::Open.into())));
    }

    #[test]
    fn test_jitter_factor_is_clamped() {
        assert_eq!(RetryConfig::new().with_jitter_factor(3.0).jitter_factor, 1.0);
        assert_eq!(RetryConfig::new().with_jitter_factor(-1.0).jitter_factor, 0.0);
        assert_eq!(RetryConfig::new().with_jitter_factor(f64::NAN).jitter_factor, 0.0);
    }
}
