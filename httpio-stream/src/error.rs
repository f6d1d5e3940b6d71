use std::error::Error as StdError;
use std::io;

use thiserror::Error;

/// Boxed error returned by stream handlers.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Error that stopped a decoder.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Reading the body failed.
    #[error("stream read failed: {0}")]
    Io(#[from] io::Error),

    /// A line did not hold a valid JSON value.
    #[error("invalid JSON on line {line}: {source}")]
    Json {
        /// One-based line number within the stream.
        line: usize,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// A line grew past the configured limit without a delimiter.
    #[error("line exceeds maximum length of {limit} bytes")]
    LineTooLong {
        /// The configured limit.
        limit: usize,
    },

    /// The response did not carry the expected content type.
    #[error("unexpected content type: {actual}")]
    ContentType {
        /// Substring that was required.
        expected: String,
        /// The `Content-Type` header value, empty when absent.
        actual: String,
    },

    /// The handler returned an error; it is carried unchanged.
    #[error(transparent)]
    Handler(BoxError),
}

impl StreamError {
    /// Wraps a handler error.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        StreamError::Handler(err.into())
    }

    /// The handler's own error, if this is one and it has type `E`.
    pub fn handler_error<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            StreamError::Handler(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Takes the handler's error out, if this is a handler error.
    pub fn into_handler_error(self) -> Result<BoxError, Self> {
        match self {
            StreamError::Handler(err) => Ok(err),
            other => Err(other),
        }
    }
}
