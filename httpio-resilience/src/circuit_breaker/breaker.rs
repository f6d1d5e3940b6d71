//! Circuit breaker implementation.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use httpio_core::{CircuitOpenError, Response, Result};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{CircuitBreakerConfig, CircuitState};
use crate::metrics;

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    last_transition_at: Instant,
    half_open_probes: u32,
    /// Bumped on every transition so results from calls admitted under an
    /// earlier state are ignored.
    generation: u64,
}

type Transition = Option<(CircuitState, CircuitState)>;

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            last_transition_at: Instant::now(),
            half_open_probes: 0,
            generation: 0,
        }
    }

    fn transition(&mut self, to: CircuitState) -> Transition {
        if self.state == to {
            return None;
        }
        let from = self.state;
        self.state = to;
        self.last_transition_at = Instant::now();
        self.generation += 1;
        if to == CircuitState::HalfOpen {
            self.half_open_probes = 0;
        }
        Some((from, to))
    }
}

/// Fails fast after repeated failures and periodically probes for recovery.
///
/// # States
///
/// - **Closed**: requests pass through; consecutive failures are counted and
///   any success resets the count.
/// - **Open**: requests are rejected with [`CircuitOpenError`] until the
///   recovery timeout has elapsed since the last failure.
/// - **Half-Open**: up to `half_open_max_calls` probes are admitted. A
///   successful probe closes the circuit; a failed probe reopens it.
///
/// Admission and result recording each happen under a single lock, so
/// concurrent callers can neither under-count failures nor admit more probes
/// than the budget allows.
///
/// # Example
///
/// ```rust,ignore
/// let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
///
/// let permit = breaker.acquire()?;
/// let outcome = send().await;
/// permit.record(breaker.is_failure(&outcome));
/// ```
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Creates a closed breaker. Zero thresholds fall back to defaults.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config: config.normalized(),
            inner: Mutex::new(BreakerInner::new()),
        }
    }

    /// Creates a breaker with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, transition: Transition) {
        let Some((from, to)) = transition else {
            return;
        };
        debug!(breaker = %self.config.name, %from, %to, "circuit breaker state changed");
        metrics::record_transition(&self.config.name, to);
        if let Some(observer) = &self.config.on_state_change {
            observer(from, to);
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// The current state.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Consecutive failures counted while closed.
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// When the breaker last changed state.
    pub fn last_transition_at(&self) -> Instant {
        self.lock().last_transition_at
    }

    /// True while open or half-open.
    pub fn is_open(&self) -> bool {
        self.lock().state != CircuitState::Closed
    }

    /// Classifies an outcome with the configured predicate.
    pub fn is_failure(&self, outcome: &Result<Response>) -> bool {
        self.config.is_failure(outcome)
    }

    /// Forces the breaker closed with zeroed counters.
    pub fn reset(&self) {
        let transition = {
            let mut inner = self.lock();
            inner.consecutive_failures = 0;
            inner.half_open_probes = 0;
            inner.last_failure_at = None;
            let transition = inner.transition(CircuitState::Closed);
            // Outstanding permits must not count against the fresh state.
            inner.generation += 1;
            transition
        };
        self.notify(transition);
    }

    /// Asks to let one call through.
    ///
    /// The returned [`Permit`] must be resolved with [`Permit::record`]; a
    /// permit dropped unresolved is recorded as a failure.
    pub fn acquire(&self) -> std::result::Result<Permit<'_>, CircuitOpenError> {
        let (admitted, transition) = {
            let mut inner = self.lock();
            let mut transition = None;

            if inner.state == CircuitState::Open {
                let reference = inner.last_failure_at.unwrap_or(inner.last_transition_at);
                if reference.elapsed() >= self.config.recovery_timeout {
                    transition = inner.transition(CircuitState::HalfOpen);
                }
            }

            let admitted = match inner.state {
                CircuitState::Closed => Ok(inner.generation),
                CircuitState::Open => Err(CircuitOpenError::Open),
                CircuitState::HalfOpen => {
                    if inner.half_open_probes < self.config.half_open_max_calls {
                        inner.half_open_probes += 1;
                        Ok(inner.generation)
                    } else {
                        Err(CircuitOpenError::HalfOpenSaturated)
                    }
                }
            };
            (admitted, transition)
        };
        self.notify(transition);

        match admitted {
            Ok(generation) => Ok(Permit {
                breaker: self,
                generation,
                resolved: false,
            }),
            Err(err) => {
                debug!(breaker = %self.config.name, error = %err, "request rejected");
                metrics::record_rejection(&self.config.name);
                Err(err)
            }
        }
    }

    fn record(&self, generation: u64, failure: bool) {
        let transition = {
            let mut inner = self.lock();
            if inner.generation != generation {
                return;
            }
            if failure {
                inner.last_failure_at = Some(Instant::now());
            }
            match (inner.state, failure) {
                (CircuitState::Closed, true) => {
                    inner.consecutive_failures += 1;
                    if inner.consecutive_failures >= self.config.failure_threshold {
                        warn!(
                            breaker = %self.config.name,
                            failures = inner.consecutive_failures,
                            "failure threshold reached, opening circuit"
                        );
                        inner.transition(CircuitState::Open)
                    } else {
                        None
                    }
                }
                (CircuitState::Closed, false) => {
                    inner.consecutive_failures = 0;
                    None
                }
                (CircuitState::HalfOpen, true) => inner.transition(CircuitState::Open),
                (CircuitState::HalfOpen, false) => {
                    inner.consecutive_failures = 0;
                    inner.transition(CircuitState::Closed)
                }
                (CircuitState::Open, _) => None,
            }
        };
        self.notify(transition);
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Display for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        write!(
            f,
            "CircuitBreaker [State: {}, Consecutive Errors: {}/{}]",
            inner.state, inner.consecutive_failures, self.config.failure_threshold
        )
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("inner", &*self.lock())
            .finish()
    }
}

/// Admission ticket for one call through a [`CircuitBreaker`].
#[must_use = "a permit dropped without recording counts as a failure"]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    resolved: bool,
}

impl Permit<'_> {
    /// Records the call's outcome.
    pub fn record(mut self, failure: bool) {
        self.resolved = true;
        self.breaker.record(self.generation, failure);
    }

    /// Records a success.
    pub fn success(self) {
        self.record(false);
    }

    /// Records a failure.
    pub fn failure(self) {
        self.record(true);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            self.breaker.record(self.generation, true);
        }
    }
}

impl fmt::Debug for Permit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit")
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn breaker(threshold: u32, recovery: Duration, probes: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            CircuitBreakerConfig::new()
                .with_failure_threshold(threshold)
                .with_recovery_timeout(recovery)
                .with_half_open_max_calls(probes),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn opens_after_consecutive_failures() {
        let cb = breaker(3, Duration::from_secs(10), 1);
        for _ in 0..3 {
            cb.acquire().unwrap().failure();
        }
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.acquire().unwrap_err(), CircuitOpenError::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_the_count() {
        let cb = breaker(3, Duration::from_secs(10), 1);
        cb.acquire().unwrap().failure();
        cb.acquire().unwrap().failure();
        cb.acquire().unwrap().success();
        assert_eq!(cb.consecutive_failures(), 0);
        cb.acquire().unwrap().failure();
        cb.acquire().unwrap().failure();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_probe_budget_is_enforced() {
        let cb = breaker(1, Duration::from_secs(5), 2);
        cb.acquire().unwrap().failure();
        tokio::time::advance(Duration::from_secs(5)).await;

        let first = cb.acquire().unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        let second = cb.acquire().unwrap();
        assert_eq!(
            cb.acquire().unwrap_err(),
            CircuitOpenError::HalfOpenSaturated
        );

        first.success();
        assert_eq!(cb.state(), CircuitState::Closed);
        // The second probe belongs to the finished half-open episode.
        second.failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probe_reopens() {
        let cb = breaker(1, Duration::from_secs(5), 1);
        cb.acquire().unwrap().failure();
        tokio::time::advance(Duration::from_secs(5)).await;
        cb.acquire().unwrap().failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.acquire().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_permit_counts_as_failure() {
        let cb = breaker(1, Duration::from_secs(5), 1);
        drop(cb.acquire().unwrap());
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn observer_sees_every_transition() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cb = CircuitBreaker::new(
            CircuitBreakerConfig::new()
                .with_failure_threshold(1)
                .with_recovery_timeout(Duration::from_secs(1))
                .with_on_state_change(move |from, to| sink.lock().unwrap().push((from, to))),
        );

        cb.acquire().unwrap().failure();
        tokio::time::advance(Duration::from_secs(1)).await;
        cb.acquire().unwrap().success();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (CircuitState::Closed, CircuitState::Open),
                (CircuitState::Open, CircuitState::HalfOpen),
                (CircuitState::HalfOpen, CircuitState::Closed),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn observer_may_reenter_the_breaker() {
        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = states.clone();
        let cb = Arc::new_cyclic(|weak: &std::sync::Weak<CircuitBreaker>| {
            let weak = weak.clone();
            CircuitBreaker::new(
                CircuitBreakerConfig::new()
                    .with_failure_threshold(1)
                    .with_on_state_change(move |_, _| {
                        if let Some(cb) = weak.upgrade() {
                            sink.lock().unwrap().push(cb.state());
                        }
                    }),
            )
        });

        cb.acquire().unwrap().failure();
        assert_eq!(*states.lock().unwrap(), vec![CircuitState::Open]);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_closes_and_clears() {
        let cb = breaker(1, Duration::from_secs(60), 1);
        cb.acquire().unwrap().failure();
        assert!(cb.is_open());
        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.consecutive_failures(), 0);
        assert!(cb.acquire().is_ok());
    }

    #[test]
    fn display_shows_state_and_count() {
        let cb = breaker(5, Duration::from_secs(60), 1);
        assert_eq!(
            cb.to_string(),
            "CircuitBreaker [State: CLOSED, Consecutive Errors: 0/5]"
        );
    }
}
