//! The client and its builder.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::header::USER_AGENT;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use httpio_core::{Chain, Middleware, Transport};

use crate::{ReqwestTransport, RequestBuilder};

/// `User-Agent` sent unless another one is configured.
pub const DEFAULT_USER_AGENT: &str = "httpio";

/// An HTTP client running every request through a middleware chain.
///
/// Cloning is cheap and clones share configuration and connection pool.
///
/// ```no_run
/// # async fn run() -> Result<(), httpio::Error> {
/// use std::time::Duration;
/// use httpio::{Client, Context, RetryConfig, RetryMiddleware, TracingMiddleware};
///
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .timeout(Duration::from_secs(10))
///     .middleware(TracingMiddleware::new())
///     .middleware(RetryMiddleware::new(RetryConfig::default()))
///     .build();
///
/// let users = client.get("/users").query("page", "2").send(&Context::new()).await?;
/// println!("{}", users.text().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    middlewares: Vec<Arc<dyn Middleware>>,
    base_url: Option<String>,
    headers: HeaderMap,
    timeout: Option<Duration>,
}

impl Client {
    /// A client with default settings over [`ReqwestTransport`].
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Starts a request.
    ///
    /// `url` is used as is when absolute and appended to the base URL
    /// otherwise.
    pub fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.clone(), method, url.into())
    }

    /// Starts a GET request.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Starts a POST request.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Starts a PUT request.
    pub fn put(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Starts a HEAD request.
    pub fn head(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// Starts an OPTIONS request.
    pub fn options(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::OPTIONS, url)
    }

    /// Client-level middlewares, outermost first.
    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.inner.middlewares
    }

    /// The base URL, if one is set.
    pub fn base_url(&self) -> Option<&str> {
        self.inner.base_url.as_deref()
    }

    /// Headers added to every request.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// Timeout applied to requests that set none.
    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    pub(crate) fn resolve(&self, url: &str) -> String {
        match &self.inner.base_url {
            Some(base) if !is_absolute(url) => {
                if url.is_empty() {
                    base.clone()
                } else {
                    format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
                }
            }
            _ => url.to_owned(),
        }
    }

    /// Client middlewares followed by request-scoped ones.
    pub(crate) fn chain(&self, request_middlewares: &[Arc<dyn Middleware>]) -> Chain {
        Chain::from_arc(self.inner.transport.clone())
            .extend(self.inner.middlewares.iter().cloned())
            .extend(request_middlewares.iter().cloned())
    }
}

fn is_absolute(url: &str) -> bool {
    url.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .field("headers", &self.inner.headers)
            .field("middlewares", &self.inner.middlewares.len())
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    middlewares: Vec<Arc<dyn Middleware>>,
    base_url: Option<String>,
    headers: HeaderMap,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    /// A builder with the default `User-Agent` and no middlewares.
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        Self {
            transport: None,
            middlewares: Vec::new(),
            base_url: None,
            headers,
            timeout: None,
        }
    }

    /// Prefix for relative request URLs.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets a header sent with every request.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets several headers sent with every request.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Default timeout for each request, including every retry attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Appends a middleware. The first one added sees requests first.
    pub fn middleware<M: Middleware>(self, middleware: M) -> Self {
        self.middleware_arc(Arc::new(middleware))
    }

    /// Appends a shared middleware.
    pub fn middleware_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Replaces the network transport.
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Uses a preconfigured reqwest client as the transport.
    pub fn reqwest_client(self, client: reqwest::Client) -> Self {
        self.transport(ReqwestTransport::from_client(client))
    }

    /// Builds the client.
    pub fn build(self) -> Client {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));
        Client {
            inner: Arc::new(ClientInner {
                transport,
                middlewares: self.middlewares,
                base_url: self.base_url,
                headers: self.headers,
                timeout: self.timeout,
            }),
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("middlewares", &self.middlewares.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_urls_join_the_base() {
        let client = Client::builder().base_url("http://api.test/v1/").build();
        assert_eq!(client.resolve("/users"), "http://api.test/v1/users");
        assert_eq!(client.resolve("users"), "http://api.test/v1/users");
        assert_eq!(client.resolve(""), "http://api.test/v1/");
        assert_eq!(client.resolve("https://other.test/x"), "https://other.test/x");
    }

    #[test]
    fn without_base_urls_are_untouched() {
        let client = Client::new();
        assert_eq!(client.resolve("http://api.test/a"), "http://api.test/a");
        assert_eq!(client.default_headers()[USER_AGENT], DEFAULT_USER_AGENT);
    }
}
