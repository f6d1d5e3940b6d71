use async_trait::async_trait;
use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Uri, Version};
use httpio_core::{
    Body, BodyFactory, BoxError, Context, Middleware, Next, Request, Response, Result,
};
use tracing::debug;

use super::RetryConfig;
use crate::metrics;

/// Re-issues failed requests with exponential backoff.
///
/// The first attempt always runs. After a retryable outcome (see
/// [`RetryConfig::is_retryable`]) the middleware waits for the backoff delay
/// and runs the rest of the chain again, up to `max_retries` more times. The
/// last outcome is returned when retries are exhausted.
///
/// A request can only be sent again when its body can be reproduced: either
/// a [`BodyFactory`] is stored in the request extensions, or the body is
/// fully buffered. Requests with a one-shot streaming body are sent once.
///
/// Cancelling the [`Context`] while waiting aborts immediately with the
/// context error.
#[derive(Clone, Debug, Default)]
pub struct RetryMiddleware {
    config: RetryConfig,
}

impl RetryMiddleware {
    /// Creates a retry middleware.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl Middleware for RetryMiddleware {
    async fn handle(&self, ctx: &Context, req: Request, next: Next<'_>) -> Result<Response> {
        let (parts, body) = req.into_parts();
        let template = RequestTemplate::capture(&parts, &body);
        let mut outcome = next.run(ctx, Request::from_parts(parts, body)).await;

        for attempt in 0..self.config.max_retries {
            if !self.config.is_retryable(&outcome) {
                return outcome;
            }
            let Some(template) = template.as_ref() else {
                debug!("request body cannot be replayed, not retrying");
                return outcome;
            };
            if let Some(err) = ctx.err() {
                return Err(err);
            }
            let req = match template.build() {
                Ok(req) => req,
                Err(err) => {
                    debug!(error = %err, "failed to rebuild request body, not retrying");
                    return outcome;
                }
            };

            let reason = match &outcome {
                Err(_) => "error",
                Ok(_) => "status",
            };
            let delay = self.config.backoff(attempt);
            match &outcome {
                Err(err) => debug!(
                    attempt = attempt + 1,
                    max_retries = self.config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying request"
                ),
                Ok(res) => debug!(
                    attempt = attempt + 1,
                    max_retries = self.config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    status = res.status().as_u16(),
                    "retrying request"
                ),
            }
            // The previous response is not handed back, release its connection.
            drop(outcome);

            tokio::select! {
                biased;
                err = ctx.done() => return Err(err),
                _ = tokio::time::sleep(delay) => {}
            }

            metrics::record_retry_attempt(reason);
            outcome = next.run(ctx, req).await;
        }

        outcome
    }
}

enum BodySource {
    Factory(BodyFactory),
    Bytes(Bytes),
    Empty,
}

/// Everything needed to send a request again.
struct RequestTemplate {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    extensions: Extensions,
    body: BodySource,
}

impl RequestTemplate {
    /// Returns `None` when the body is a one-shot stream.
    fn capture(parts: &http::request::Parts, body: &Body) -> Option<Self> {
        let body = if let Some(factory) = parts.extensions.get::<BodyFactory>() {
            BodySource::Factory(factory.clone())
        } else if let Some(bytes) = body.as_bytes() {
            BodySource::Bytes(bytes.clone())
        } else if body.is_empty() {
            BodySource::Empty
        } else {
            return None;
        };
        Some(Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            version: parts.version,
            headers: parts.headers.clone(),
            extensions: parts.extensions.clone(),
            body,
        })
    }

    fn build(&self) -> std::result::Result<Request, BoxError> {
        let body = match &self.body {
            BodySource::Factory(factory) => factory.make()?,
            BodySource::Bytes(bytes) => Body::full(bytes.clone()),
            BodySource::Empty => Body::empty(),
        };
        let mut req = Request::new(body);
        *req.method_mut() = self.method.clone();
        *req.uri_mut() = self.uri.clone();
        *req.version_mut() = self.version;
        *req.headers_mut() = self.headers.clone();
        *req.extensions_mut() = self.extensions.clone();
        Ok(req)
    }
}

impl From<RetryConfig> for RetryMiddleware {
    fn from(config: RetryConfig) -> Self {
        Self::new(config)
    }
}
