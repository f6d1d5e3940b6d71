use thiserror::Error;

use httpio_stream::StreamError;

/// Error returned by the response helpers that decode a body.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Sending the request or reading the body failed.
    #[error(transparent)]
    Request(#[from] httpio_core::Error),

    /// A streaming decoder stopped.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The body was not the expected JSON document.
    #[error("failed to decode JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// The request-path error, if this is one.
    pub fn as_request(&self) -> Option<&httpio_core::Error> {
        match self {
            ClientError::Request(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the request was refused by an open circuit breaker.
    pub fn is_circuit_open(&self) -> bool {
        self.as_request().is_some_and(httpio_core::Error::is_circuit_open)
    }

    /// Whether the caller's deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        self.as_request().is_some_and(httpio_core::Error::is_timeout)
    }
}
