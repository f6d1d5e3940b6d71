//! An HTTP client built around a middleware chain.
//!
//! Every request goes through the client's middlewares, then any
//! request-scoped ones, and finally the [`Transport`] (reqwest by default).
//! The pieces that make the client resilient ship as middlewares:
//!
//! | Middleware | Purpose |
//! |---|---|
//! | [`CacheMiddleware`] | Serves GET/HEAD responses from a [`CacheStore`] |
//! | [`CircuitBreakerMiddleware`] | Fails fast while the upstream keeps failing |
//! | [`RetryMiddleware`] | Re-sends failed requests with exponential backoff |
//! | [`TracingMiddleware`] | One span per request |
//! | [`HeadersMiddleware`] | Static and conditional headers |
//!
//! Response bodies can be read whole or decoded incrementally as raw chunks,
//! lines, NDJSON, typed NDJSON or Server-Sent Events.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! use std::sync::Arc;
//! use httpio::{
//!     CacheConfig, CacheMiddleware, CircuitBreakerConfig, CircuitBreakerMiddleware, Client,
//!     Context, MemoryStore, RetryConfig, RetryMiddleware, SseEvent, StreamOptions,
//! };
//!
//! let store = MemoryStore::builder().capacity(1_000).build();
//! let client = Client::builder()
//!     .base_url("https://api.example.com")
//!     .middleware(CacheMiddleware::new(Arc::new(store), CacheConfig::default())?)
//!     .middleware(RetryMiddleware::new(RetryConfig::default()))
//!     .middleware(CircuitBreakerMiddleware::new(CircuitBreakerConfig::default()))
//!     .build();
//!
//! let ctx = Context::new();
//! let mut on_event = |event: SseEvent| -> Result<(), httpio::stream::BoxError> {
//!     println!("{}: {}", event.event, event.data);
//!     Ok(())
//! };
//! client
//!     .get("/events")
//!     .stream_sse(&ctx, &StreamOptions::sse(), &mut on_event)
//!     .await?;
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]

mod client;
mod error;
pub mod middleware;
mod request;
mod response;
mod transport;

pub use client::{Client, ClientBuilder, DEFAULT_USER_AGENT};
pub use error::ClientError;
pub use middleware::{HeadersMiddleware, TracingMiddleware};
pub use request::RequestBuilder;
pub use response::ClientResponse;
pub use transport::ReqwestTransport;

pub use httpio_core::{
    Body, BodyFactory, Chain, CircuitOpenError, Context, Error, Middleware, Next, Request,
    Response, Result, Transport, from_fn, transport_fn,
};

pub use httpio_backend::{CacheEntry, CacheStore, StoreError, StoreResult};
pub use httpio_cache::{
    CacheConfig, CacheMiddleware, ConfigError, KeyStrategy, TtlRule, UrlPattern,
};
pub use httpio_disk::DiskStore;
pub use httpio_memory::MemoryStore;
pub use httpio_resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMiddleware, CircuitState, RetryConfig,
    RetryMiddleware,
};
pub use httpio_stream::{Delimiter, SseCallbacks, SseEvent, SseHandler, StreamError, StreamOptions};

/// Building blocks of the response cache.
pub mod cache {
    pub use httpio_cache::*;
}

/// Decoders usable on any [`AsyncRead`](tokio::io::AsyncRead).
pub mod stream {
    pub use httpio_stream::*;
}
