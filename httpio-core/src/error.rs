//! Error types shared by every layer of the pipeline.

use thiserror::Error;

use crate::body::BoxError;

/// Result alias used across the pipeline.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error returned by transports and middlewares.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying transport failed to produce a response.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The caller's context was cancelled.
    #[error("context canceled")]
    Canceled,

    /// The caller's context deadline elapsed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// A circuit breaker refused the request.
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    /// Reading or producing a body failed.
    #[error("body error: {0}")]
    Body(#[source] BoxError),

    /// A middleware failed for a reason of its own.
    #[error("middleware error: {0}")]
    Middleware(#[source] BoxError),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(#[source] BoxError),
}

impl Error {
    /// Wraps a transport failure.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Error::Transport(err.into())
    }

    /// Wraps a body failure.
    pub fn body(err: impl Into<BoxError>) -> Self {
        Error::Body(err.into())
    }

    /// Wraps a middleware failure.
    pub fn middleware(err: impl Into<BoxError>) -> Self {
        Error::Middleware(err.into())
    }

    /// Wraps a request construction failure.
    pub fn invalid_request(err: impl Into<BoxError>) -> Self {
        Error::InvalidRequest(err.into())
    }

    /// True when the context was cancelled or its deadline elapsed.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled | Error::DeadlineExceeded)
    }

    /// True when the deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::DeadlineExceeded)
    }

    /// True when a circuit breaker rejected the request.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Error::CircuitOpen(_))
    }
}

/// Rejection produced by a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CircuitOpenError {
    /// The breaker is open and the recovery timeout has not elapsed.
    #[error("circuit breaker is open - request rejected")]
    Open,
    /// The breaker is half-open and every probe slot is taken.
    #[error("circuit breaker is half-open and maximum test requests reached")]
    HalfOpenSaturated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuit_open_is_recognisable() {
        let err: Error = CircuitOpenError::Open.into();
        assert!(err.is_circuit_open());
        assert!(!err.is_canceled());
        assert_eq!(err.to_string(), "circuit breaker is open - request rejected");
    }

    #[test]
    fn deadline_counts_as_canceled() {
        assert!(Error::DeadlineExceeded.is_canceled());
        assert!(Error::DeadlineExceeded.is_timeout());
        assert!(!Error::Canceled.is_timeout());
    }
}
