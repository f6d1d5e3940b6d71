use async_trait::async_trait;
use httpio_core::{Context, Middleware, Next, Request, Response, Result};
use tokio::time::Instant;
use tracing::field::Empty;
use tracing::{Instrument, debug, info_span, warn};

/// Wraps every request in an `http.request` span.
///
/// The span carries `method` and `uri` from the start and records `status`
/// and `elapsed_ms` once the rest of the chain returns. Place it first to
/// time the whole pipeline, or after the retry middleware to get one span
/// per attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMiddleware;

impl TracingMiddleware {
    /// Creates the middleware.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for TracingMiddleware {
    async fn handle(&self, ctx: &Context, req: Request, next: Next<'_>) -> Result<Response> {
        let span = info_span!(
            "http.request",
            method = %req.method(),
            uri = %req.uri(),
            status = Empty,
            elapsed_ms = Empty,
        );

        async move {
            let started = Instant::now();
            let outcome = next.run(ctx, req).await;
            let span = tracing::Span::current();
            span.record("elapsed_ms", started.elapsed().as_millis() as u64);
            match &outcome {
                Ok(response) => {
                    span.record("status", response.status().as_u16());
                    debug!("request completed");
                }
                Err(err) => warn!(error = %err, "request failed"),
            }
            outcome
        }
        .instrument(span)
        .await
    }
}
