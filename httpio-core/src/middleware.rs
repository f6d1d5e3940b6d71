//! Middleware composition.
//!
//! Middlewares form an onion around a [`Transport`]: the first middleware in a
//! [`Chain`] sees the request first and the response last. Each middleware
//! receives a [`Next`] handle and decides whether (and how many times) to call
//! into the rest of the chain.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::context::Context;
use crate::error::Result;
use crate::transport::Transport;
use crate::{Request, Response};

/// A request interceptor.
///
/// Implementations may rewrite the request, short-circuit without calling
/// `next`, call `next` several times, or translate the outcome.
///
/// # Examples
///
/// ```rust,ignore
/// struct Stamp;
///
/// #[async_trait]
/// impl Middleware for Stamp {
///     async fn handle(&self, ctx: &Context, mut req: Request, next: Next<'_>) -> Result<Response> {
///         req.headers_mut().insert("x-stamp", HeaderValue::from_static("1"));
///         next.run(ctx, req).await
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Processes `req`, delegating to `next` for the rest of the chain.
    async fn handle(&self, ctx: &Context, req: Request, next: Next<'_>) -> Result<Response>;
}

#[async_trait]
impl<M> Middleware for Arc<M>
where
    M: Middleware + ?Sized,
{
    async fn handle(&self, ctx: &Context, req: Request, next: Next<'_>) -> Result<Response> {
        self.as_ref().handle(ctx, req, next).await
    }
}

/// The remainder of a chain, as seen from inside a middleware.
///
/// `Next` is `Copy`, so a middleware that re-issues a request simply runs the
/// same handle again.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    transport: &'a dyn Transport,
    middlewares: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    /// Creates a handle over `middlewares` terminating in `transport`.
    pub fn new(transport: &'a dyn Transport, middlewares: &'a [Arc<dyn Middleware>]) -> Self {
        Self {
            transport,
            middlewares,
        }
    }

    /// Runs the rest of the chain.
    ///
    /// The terminal transport call is raced against `ctx`, so a cancelled or
    /// expired context resolves immediately with its error.
    pub async fn run(self, ctx: &Context, req: Request) -> Result<Response> {
        match self.middlewares.split_first() {
            Some((current, rest)) => {
                let next = Next {
                    transport: self.transport,
                    middlewares: rest,
                };
                current.handle(ctx, req, next).await
            }
            None => {
                if let Some(err) = ctx.err() {
                    return Err(err);
                }
                tokio::select! {
                    biased;
                    err = ctx.done() => Err(err),
                    res = self.transport.send(ctx, req) => res,
                }
            }
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.middlewares.len())
            .finish()
    }
}

/// An ordered list of middlewares wrapped around a transport.
#[derive(Clone)]
pub struct Chain {
    transport: Arc<dyn Transport>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    /// A chain with no middlewares.
    pub fn new<T>(transport: T) -> Self
    where
        T: Transport + 'static,
    {
        Self::from_arc(Arc::new(transport))
    }

    /// A chain over a shared transport.
    pub fn from_arc(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            middlewares: Vec::new(),
        }
    }

    /// Appends a middleware. Earlier middlewares wrap later ones.
    pub fn with<M>(self, middleware: M) -> Self
    where
        M: Middleware,
    {
        self.with_arc(Arc::new(middleware))
    }

    /// Appends a shared middleware.
    pub fn with_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Appends several shared middlewares in order.
    pub fn extend<I>(mut self, middlewares: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        self.middlewares.extend(middlewares);
        self
    }

    /// The configured middlewares, outermost first.
    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }

    /// The terminal transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Runs `req` through every middleware and then the transport.
    pub async fn execute(&self, ctx: &Context, req: Request) -> Result<Response> {
        Next::new(self.transport.as_ref(), &self.middlewares)
            .run(ctx, req)
            .await
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

/// Middleware backed by a closure. See [`from_fn`].
pub struct FnMiddleware<F>(F);

/// Turns a closure into a [`Middleware`].
///
/// ```rust,ignore
/// let mw = from_fn(|ctx, req, next| Box::pin(async move {
///     let res = next.run(ctx, req).await?;
///     tracing::debug!(status = %res.status(), "done");
///     Ok(res)
/// }));
/// ```
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(&'a Context, Request, Next<'a>) -> BoxFuture<'a, Result<Response>>
        + Send
        + Sync
        + 'static,
{
    FnMiddleware(f)
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a Context, Request, Next<'a>) -> BoxFuture<'a, Result<Response>>
        + Send
        + Sync
        + 'static,
{
    async fn handle(&self, ctx: &Context, req: Request, next: Next<'_>) -> Result<Response> {
        (self.0)(ctx, req, next).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use http::StatusCode;

    use super::*;
    use crate::body::Body;
    use crate::error::Error;
    use crate::transport::transport_fn;

    struct Record {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware for Record {
        async fn handle(&self, ctx: &Context, req: Request, next: Next<'_>) -> Result<Response> {
            self.log.lock().unwrap().push(format!("{}:in", self.name));
            let res = next.run(ctx, req).await;
            self.log.lock().unwrap().push(format!("{}:out", self.name));
            res
        }
    }

    fn ok_transport() -> impl Transport {
        transport_fn(|_ctx, _req| async { Ok(Response::new(Body::from("ok"))) })
    }

    #[tokio::test]
    async fn first_middleware_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = Chain::new(ok_transport())
            .with(Record {
                name: "a",
                log: log.clone(),
            })
            .with(Record {
                name: "b",
                log: log.clone(),
            });

        let res = chain
            .execute(&Context::new(), Request::new(Body::empty()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:in", "b:in", "b:out", "a:out"]
        );
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        let chain = Chain::new(transport_fn(|_ctx, _req| async {
            Err(Error::transport("should not be called"))
        }))
        .with(from_fn(|_ctx, _req, _next| {
            Box::pin(async {
                let mut res = Response::new(Body::empty());
                *res.status_mut() = StatusCode::NO_CONTENT;
                Ok(res)
            })
        }));

        let res = chain
            .execute(&Context::new(), Request::new(Body::empty()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn errors_propagate_unchanged() {
        let chain = Chain::new(transport_fn(|_ctx, _req| async {
            Err(Error::transport("boom"))
        }))
        .with(from_fn(|ctx, req, next| Box::pin(next.run(ctx, req))));

        let err = chain
            .execute(&Context::new(), Request::new(Body::empty()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn cancelled_context_skips_transport() {
        let chain = Chain::new(transport_fn(|_ctx, _req| async {
            Err(Error::transport("should not be called"))
        }));
        let ctx = Context::new();
        ctx.cancel();
        let err = chain
            .execute(&ctx, Request::new(Body::empty()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_slow_transport() {
        let chain = Chain::new(transport_fn(|_ctx, _req| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Response::new(Body::empty()))
        }));
        let ctx = Context::new().with_timeout(Duration::from_millis(100));
        let err = chain
            .execute(&ctx, Request::new(Body::empty()))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
