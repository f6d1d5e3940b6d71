//! Request building and sending.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use httpio_core::{Body, BodyFactory, Context, Error, Middleware, Request, Result};
use httpio_stream::{BoxError, SseHandler, StreamOptions};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

use crate::{Client, ClientError, ClientResponse};

/// A request being prepared by a [`Client`].
///
/// Configuration errors (an invalid header, a body that fails to serialize)
/// are held back and reported by [`send`](Self::send) or
/// [`build`](Self::build).
///
/// Bodies are stored as a [`BodyFactory`] so middlewares such as
/// `RetryMiddleware` can send the request again.
pub struct RequestBuilder {
    client: Client,
    method: Method,
    url: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<BodyFactory>,
    middlewares: Vec<Arc<dyn Middleware>>,
    timeout: Option<Duration>,
    error: Option<Error>,
}

impl RequestBuilder {
    pub(crate) fn new(client: Client, method: Method, url: String) -> Self {
        Self {
            client,
            method,
            url,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            middlewares: Vec::new(),
            timeout: None,
            error: None,
        }
    }

    /// Sets a header, replacing client defaults of the same name.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let name: Result<HeaderName, http::Error> = HeaderName::try_from(name).map_err(Into::into);
        let value: Result<HeaderValue, http::Error> =
            HeaderValue::try_from(value).map_err(Into::into);
        match (name, value) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            (Err(err), _) | (_, Err(err)) => self.fail(Error::invalid_request(err)),
        }
        self
    }

    /// Sets several headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Appends a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Appends several query parameters.
    pub fn query_pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets a buffered body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(BodyFactory::from_bytes(body));
        self
    }

    /// Sets a text body, with `Content-Type: text/plain` unless one is set.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.body(text.into())
            .default_content_type("text/plain; charset=utf-8")
    }

    /// Serializes `value` as the JSON body, with
    /// `Content-Type: application/json` unless one is set.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => self.body(body).default_content_type("application/json"),
            Err(err) => {
                self.fail(Error::invalid_request(err));
                self
            }
        }
    }

    /// Sets a body produced anew for every attempt, for streamed uploads
    /// that must survive retries.
    pub fn body_factory(mut self, factory: BodyFactory) -> Self {
        self.body = Some(factory);
        self
    }

    /// Appends a middleware that runs for this request only, after the
    /// client's middlewares.
    pub fn middleware<M: Middleware>(self, middleware: M) -> Self {
        self.middleware_arc(Arc::new(middleware))
    }

    /// Appends a shared request-scoped middleware.
    pub fn middleware_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Overrides the client timeout for this request.
    ///
    /// The deadline covers the whole chain, retries and backoff included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn fail(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn default_content_type(mut self, value: &'static str) -> Self {
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(value));
        }
        self
    }

    fn url(&self) -> Result<Uri> {
        let mut url = self.client.resolve(&self.url);
        if !self.query.is_empty() {
            let encoded = serde_urlencoded::to_string(&self.query).map_err(Error::invalid_request)?;
            if !url.ends_with('?') && !url.ends_with('&') {
                url.push(if url.contains('?') { '&' } else { '?' });
            }
            url.push_str(&encoded);
        }
        url.parse().map_err(Error::invalid_request)
    }

    /// Assembles the request without sending it.
    pub fn build(self) -> Result<Request> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let uri = self.url()?;

        let mut headers = self.client.default_headers().clone();
        headers.extend(self.headers);

        let body = match &self.body {
            Some(factory) => factory.make().map_err(Error::body)?,
            None => Body::empty(),
        };

        let mut request = Request::new(body);
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;
        if let Some(factory) = self.body {
            request.extensions_mut().insert(factory);
        }
        Ok(request)
    }

    /// Sends the request through the client's chain.
    pub async fn send(self, ctx: &Context) -> Result<ClientResponse> {
        let chain = self.client.chain(&self.middlewares);
        let timeout = self.timeout.or(self.client.timeout());
        let request = self.build()?;

        let response = match timeout {
            Some(timeout) => chain.execute(&ctx.with_timeout(timeout), request).await?,
            None => chain.execute(ctx, request).await?,
        };
        Ok(ClientResponse::new(response))
    }

    /// Sends the request and forwards raw body chunks to `handler`.
    pub async fn stream_raw<F, E>(
        self,
        ctx: &Context,
        options: &StreamOptions,
        handler: F,
    ) -> Result<(), ClientError>
    where
        F: FnMut(&[u8]) -> Result<(), E>,
        E: Into<BoxError>,
    {
        let response = self.send(ctx).await?;
        Ok(response.stream_raw(options, handler).await?)
    }

    /// Sends the request and calls `handler` with each line of the body.
    pub async fn stream_lines<F, E>(
        self,
        ctx: &Context,
        options: &StreamOptions,
        handler: F,
    ) -> Result<(), ClientError>
    where
        F: FnMut(&[u8]) -> Result<(), E>,
        E: Into<BoxError>,
    {
        let response = self.send(ctx).await?;
        Ok(response.stream_lines(options, handler).await?)
    }

    /// Sends the request and calls `handler` with each NDJSON value.
    pub async fn stream_json<F, E>(
        self,
        ctx: &Context,
        options: &StreamOptions,
        handler: F,
    ) -> Result<(), ClientError>
    where
        F: FnMut(&RawValue) -> Result<(), E>,
        E: Into<BoxError>,
    {
        let response = self.send(ctx).await?;
        Ok(response.stream_json(options, handler).await?)
    }

    /// Sends the request and decodes each NDJSON line into `T`.
    pub async fn stream_into<T, F, E>(
        self,
        ctx: &Context,
        options: &StreamOptions,
        handler: F,
    ) -> Result<(), ClientError>
    where
        T: DeserializeOwned,
        F: FnMut(T) -> Result<(), E>,
        E: Into<BoxError>,
    {
        let response = self.send(ctx).await?;
        Ok(response.stream_into(options, handler).await?)
    }

    /// Sends the request and decodes the Server-Sent Events stream.
    pub async fn stream_sse<H>(
        self,
        ctx: &Context,
        options: &StreamOptions,
        handler: &mut H,
    ) -> Result<(), ClientError>
    where
        H: SseHandler + ?Sized,
    {
        let response = self.send(ctx).await?;
        Ok(response.stream_sse(options, handler).await?)
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("middlewares", &self.middlewares.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::Client;
    use http::Method;

    #[test]
    fn query_parameters_are_encoded_and_appended() {
        let client = Client::builder().base_url("http://api.test").build();
        let req = client
            .get("/search?lang=en")
            .query("q", "rust & tokio")
            .query("page", "2")
            .build()
            .unwrap();
        assert_eq!(req.uri(), "http://api.test/search?lang=en&q=rust+%26+tokio&page=2");
    }

    #[test]
    fn request_headers_override_client_defaults() {
        let client = Client::builder()
            .header(
                http::header::ACCEPT,
                http::HeaderValue::from_static("text/html"),
            )
            .build();
        let req = client
            .request(Method::GET, "http://api.test/")
            .header("accept", "application/json")
            .build()
            .unwrap();
        assert_eq!(req.headers()["accept"], "application/json");
        assert_eq!(req.headers()["user-agent"], "httpio");
    }

    #[test]
    fn json_body_is_replayable() {
        let client = Client::new();
        let req = client
            .post("http://api.test/users")
            .json(&serde_json::json!({"name": "ada"}))
            .build()
            .unwrap();
        assert_eq!(req.headers()["content-type"], "application/json");
        let factory = req.extensions().get::<httpio_core::BodyFactory>().unwrap();
        assert_eq!(
            factory.make().unwrap().as_bytes().unwrap().as_ref(),
            br#"{"name":"ada"}"#
        );
        assert_eq!(req.body().as_bytes().unwrap().as_ref(), br#"{"name":"ada"}"#);
    }

    #[test]
    fn invalid_header_is_reported_on_build() {
        let err = Client::new()
            .get("http://api.test/")
            .header("bad header", "x")
            .build()
            .unwrap_err();
        assert!(matches!(err, httpio_core::Error::InvalidRequest(_)));
    }
}
