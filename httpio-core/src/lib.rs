#![warn(missing_docs)]
//! # httpio-core
//!
//! Core types for the httpio client pipeline.
//!
//! Every request travels through a [`Chain`]: an ordered list of
//! [`Middleware`]s wrapped around a terminal [`Transport`]. Middlewares are
//! composed like an onion, so the first one configured sees the request first
//! and the response last.
//!
//! ## Overview
//!
//! - [`Body`] - buffered or streaming HTTP body shared by requests and responses
//! - [`BodyFactory`] - re-creates a request body so it can be sent again
//! - [`Context`] - cancellation token plus optional deadline
//! - [`Transport`] - the network call at the end of the chain
//! - [`Middleware`] / [`Next`] / [`Chain`] - composition
//! - [`Error`] - request-path error, including [`CircuitOpenError`]

pub mod body;
pub mod context;
pub mod error;
pub mod middleware;
pub mod transport;

pub use body::{Body, BodyFactory, BoxError};
pub use context::Context;
pub use error::{CircuitOpenError, Error, Result};
pub use middleware::{Chain, FnMiddleware, Middleware, Next, from_fn};
pub use transport::{Transport, TransportFn, transport_fn};

/// Request type flowing through the pipeline.
pub type Request = http::Request<Body>;

/// Response type flowing through the pipeline.
pub type Response = http::Response<Body>;
