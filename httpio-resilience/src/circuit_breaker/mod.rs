//! Circuit breaker for the request pipeline.
//!
//! The circuit breaker stops sending traffic to an upstream that keeps
//! failing, then lets a few probe requests through to detect recovery.
//!
//! ## States
//!
//! - **Closed**: normal operation; requests pass through.
//! - **Open**: requests are rejected immediately.
//! - **Half-Open**: a bounded number of probes test the upstream.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use httpio_resilience::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerMiddleware};
//!
//! let middleware = CircuitBreakerMiddleware::new(
//!     CircuitBreakerConfig::default()
//!         .with_failure_threshold(5)
//!         .with_recovery_timeout(Duration::from_secs(30)),
//! );
//! ```

mod breaker;
mod config;
mod middleware;
mod state;

pub use breaker::{CircuitBreaker, Permit};
pub use config::{
    CircuitBreakerConfig, FailurePredicate, StateObserver, default_failure_predicate, defaults,
};
pub use middleware::CircuitBreakerMiddleware;
pub use state::CircuitState;
