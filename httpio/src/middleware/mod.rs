//! Middlewares that ship with the client.
//!
//! The cache, circuit breaker and retry middlewares live in their own crates
//! and are re-exported from the crate root.

mod headers;
mod trace;

pub use headers::HeadersMiddleware;
pub use trace::TracingMiddleware;
