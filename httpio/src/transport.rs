//! The default network transport.

use async_trait::async_trait;
use httpio_core::{Body, Context, Error, Request, Response, Result, Transport};
use tracing::trace;

/// Sends requests with a [`reqwest::Client`].
///
/// The context is honoured while waiting for the response head: cancellation
/// or an elapsed deadline abandons the exchange. The remaining time is also
/// handed to reqwest as the request timeout so that reading the body stays
/// bounded by the same deadline.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// A transport over a default reqwest client.
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport over a preconfigured reqwest client (pool sizes, proxies,
    /// TLS and so on).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// The underlying reqwest client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl From<reqwest::Client> for ReqwestTransport {
    fn from(client: reqwest::Client) -> Self {
        Self::from_client(client)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, ctx: &Context, req: Request) -> Result<Response> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        let (parts, body) = req.into_parts();
        let request = http::Request::from_parts(parts, reqwest::Body::wrap(body));
        let mut request: reqwest::Request = request.try_into().map_err(Error::invalid_request)?;
        if let Some(remaining) = ctx.remaining() {
            *request.timeout_mut() = Some(remaining);
        }
        trace!(method = %request.method(), url = %request.url(), "sending request");

        let response = tokio::select! {
            biased;
            err = ctx.done() => return Err(err),
            response = self.client.execute(request) => {
                // reqwest's own timeout can win the race against the deadline
                response.map_err(|err| ctx.err().unwrap_or_else(|| Error::transport(err)))?
            }
        };

        let response: http::Response<reqwest::Body> = response.into();
        Ok(response.map(Body::wrap))
    }
}
