#![warn(missing_docs)]
//! # httpio-resilience
//!
//! Middlewares that keep a client well-behaved when its upstream is not.
//!
//! - [`CircuitBreakerMiddleware`] stops calling an upstream after repeated
//!   failures and probes it for recovery.
//! - [`RetryMiddleware`] re-issues requests that failed with a retryable error
//!   or status, backing off exponentially between attempts.
//!
//! Place the retry middleware outside the circuit breaker so each attempt is
//! counted by the breaker and an open circuit ends the retries early when the
//! error predicate rejects [`httpio_core::Error::CircuitOpen`].
//!
//! ## Feature Flags
//!
//! - `metrics` - record breaker transitions, rejections and retries with the
//!   `metrics` crate

pub mod circuit_breaker;
pub mod metrics;
pub mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMiddleware, CircuitState,
};
pub use retry::{RetryConfig, RetryMiddleware};
