//! Retry with exponential backoff.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use httpio_resilience::retry::{RetryConfig, RetryMiddleware};
//!
//! let retry = RetryMiddleware::new(
//!     RetryConfig::default()
//!         .with_max_retries(5)
//!         .with_max_delay(Duration::from_secs(2))
//!         .with_jitter_factor(0.1),
//! );
//! ```

mod config;
mod middleware;

pub use config::{ErrorPredicate, RetryConfig, defaults};
pub use middleware::RetryMiddleware;
