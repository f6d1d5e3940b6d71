//! Responses returned by the client.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode, Version};
use httpio_core::{Body, Error, Response, Result};
use httpio_stream::{
    BoxError, SseHandler, StreamError, StreamOptions, stream_into, stream_json, stream_lines,
    stream_raw, stream_sse,
};
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

use crate::ClientError;

/// A response that came back through the middleware chain.
///
/// Status and headers are available at once; the body is read by one of the
/// consuming helpers, either whole ([`bytes`](Self::bytes), [`text`](Self::text),
/// [`json`](Self::json)) or incrementally (the `stream_*` family).
#[derive(Debug)]
pub struct ClientResponse {
    inner: Response,
}

impl ClientResponse {
    /// Wraps a pipeline response.
    pub fn new(inner: Response) -> Self {
        Self { inner }
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// The `Content-Type` header, when present and readable.
    pub fn content_type(&self) -> Option<&str> {
        self.headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status().is_success()
    }

    /// Status is 3xx.
    pub fn is_redirect(&self) -> bool {
        self.status().is_redirection()
    }

    /// Status is 4xx.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Status is 5xx.
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    /// Status is 4xx or 5xx.
    pub fn is_error(&self) -> bool {
        self.is_client_error() || self.is_server_error()
    }

    /// The underlying response.
    pub fn into_inner(self) -> Response {
        self.inner
    }

    /// Takes the body out.
    pub fn into_body(self) -> Body {
        self.inner.into_body()
    }

    /// Reads the whole body.
    pub async fn bytes(self) -> Result<Bytes> {
        self.into_body().collect_bytes().await.map_err(Error::body)
    }

    /// Reads the whole body as text. Invalid UTF-8 is replaced.
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Reads the whole body and deserializes it from JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Reads and discards the body.
    pub async fn consume(self) -> Result<()> {
        self.bytes().await.map(drop)
    }

    /// Forwards raw chunks to `handler`. See [`stream_raw`].
    pub async fn stream_raw<F, E>(self, options: &StreamOptions, handler: F) -> Result<(), StreamError>
    where
        F: FnMut(&[u8]) -> Result<(), E>,
        E: Into<BoxError>,
    {
        options.check_content_type(self.content_type())?;
        stream_raw(self.into_body().into_reader(), options, handler).await
    }

    /// Calls `handler` with each line. See [`stream_lines`].
    pub async fn stream_lines<F, E>(
        self,
        options: &StreamOptions,
        handler: F,
    ) -> Result<(), StreamError>
    where
        F: FnMut(&[u8]) -> Result<(), E>,
        E: Into<BoxError>,
    {
        options.check_content_type(self.content_type())?;
        stream_lines(self.into_body().into_reader(), options, handler).await
    }

    /// Calls `handler` with each NDJSON value. See [`stream_json`].
    pub async fn stream_json<F, E>(self, options: &StreamOptions, handler: F) -> Result<(), StreamError>
    where
        F: FnMut(&RawValue) -> Result<(), E>,
        E: Into<BoxError>,
    {
        options.check_content_type(self.content_type())?;
        stream_json(self.into_body().into_reader(), options, handler).await
    }

    /// Decodes each NDJSON line into `T`. See [`stream_into`].
    pub async fn stream_into<T, F, E>(
        self,
        options: &StreamOptions,
        handler: F,
    ) -> Result<(), StreamError>
    where
        T: DeserializeOwned,
        F: FnMut(T) -> Result<(), E>,
        E: Into<BoxError>,
    {
        options.check_content_type(self.content_type())?;
        stream_into(self.into_body().into_reader(), options, handler).await
    }

    /// Decodes a Server-Sent Events stream. See [`stream_sse`].
    ///
    /// The response must be `text/event-stream`; pass
    /// [`StreamOptions::sse`] unless other limits are wanted.
    pub async fn stream_sse<H>(self, options: &StreamOptions, handler: &mut H) -> Result<(), StreamError>
    where
        H: SseHandler + ?Sized,
    {
        StreamOptions::sse().check_content_type(self.content_type())?;
        options.check_content_type(self.content_type())?;
        stream_sse(self.into_body().into_reader(), options, handler).await
    }
}

impl From<Response> for ClientResponse {
    fn from(inner: Response) -> Self {
        Self::new(inner)
    }
}

impl From<ClientResponse> for Response {
    fn from(response: ClientResponse) -> Self {
        response.inner
    }
}
