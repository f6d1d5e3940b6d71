use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue};
use httpio_core::{Context, Middleware, Next, Request, Response, Result};

type Condition = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

struct ConditionalHeader {
    name: HeaderName,
    value: HeaderValue,
    condition: Condition,
}

/// Adds headers to every request passing through.
///
/// Headers the request already carries are kept unless
/// [`overwrite_existing`](HeadersMiddleware::overwrite_existing) is set.
///
/// ```
/// use http::{HeaderName, HeaderValue};
/// use httpio::HeadersMiddleware;
///
/// let headers = HeadersMiddleware::new()
///     .header(HeaderName::from_static("x-client"), HeaderValue::from_static("billing"))
///     .when(
///         HeaderName::from_static("x-write"),
///         HeaderValue::from_static("1"),
///         |req| req.method() != http::Method::GET,
///     );
/// ```
#[derive(Clone, Default)]
pub struct HeadersMiddleware {
    headers: HeaderMap,
    conditional: Vec<Arc<ConditionalHeader>>,
    overwrite: bool,
}

impl HeadersMiddleware {
    /// A middleware that adds nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every header in `headers`.
    pub fn from_headers(headers: HeaderMap) -> Self {
        Self {
            headers,
            ..Self::default()
        }
    }

    /// Adds one static header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds a header only to requests accepted by `condition`.
    pub fn when<F>(mut self, name: HeaderName, value: HeaderValue, condition: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.conditional.push(Arc::new(ConditionalHeader {
            name,
            value,
            condition: Arc::new(condition),
        }));
        self
    }

    /// Replace headers the request already carries.
    pub fn overwrite_existing(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    fn apply(&self, headers: &mut HeaderMap, name: &HeaderName, value: &HeaderValue) {
        if self.overwrite || !headers.contains_key(name) {
            headers.insert(name.clone(), value.clone());
        }
    }
}

impl fmt::Debug for HeadersMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadersMiddleware")
            .field("headers", &self.headers)
            .field("conditional", &self.conditional.len())
            .field("overwrite", &self.overwrite)
            .finish()
    }
}

#[async_trait]
impl Middleware for HeadersMiddleware {
    async fn handle(&self, ctx: &Context, mut req: Request, next: Next<'_>) -> Result<Response> {
        let mut headers = std::mem::take(req.headers_mut());
        for (name, value) in &self.headers {
            self.apply(&mut headers, name, value);
        }
        for header in &self.conditional {
            if (header.condition)(&req) {
                self.apply(&mut headers, &header.name, &header.value);
            }
        }
        *req.headers_mut() = headers;
        next.run(ctx, req).await
    }
}
