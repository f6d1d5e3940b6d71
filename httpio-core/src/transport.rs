use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Result;
use crate::{Request, Response};

/// The terminal stage of a middleware chain: actually performs the exchange.
///
/// The transport is the only component that talks to the network. Everything
/// else in the pipeline wraps it.
///
/// # Examples
///
/// ```rust,ignore
/// use httpio_core::{transport_fn, Body, Response};
///
/// let transport = transport_fn(|_ctx, _req| async {
///     Ok(Response::new(Body::from("ok")))
/// });
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `req` and resolves with the response or a transport error.
    async fn send(&self, ctx: &Context, req: Request) -> Result<Response>;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn send(&self, ctx: &Context, req: Request) -> Result<Response> {
        self.as_ref().send(ctx, req).await
    }
}

#[async_trait]
impl<T> Transport for Box<T>
where
    T: Transport + ?Sized,
{
    async fn send(&self, ctx: &Context, req: Request) -> Result<Response> {
        self.as_ref().send(ctx, req).await
    }
}

/// Transport backed by an async closure.
#[derive(Clone)]
pub struct TransportFn<F>(F);

/// Builds a [`Transport`] out of an async closure.
pub fn transport_fn<F, Fut>(f: F) -> TransportFn<F>
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    TransportFn(f)
}

#[async_trait]
impl<F, Fut> Transport for TransportFn<F>
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    async fn send(&self, ctx: &Context, req: Request) -> Result<Response> {
        (self.0)(ctx.clone(), req).await
    }
}
