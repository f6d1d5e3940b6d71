use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use http::{HeaderValue, Method, Uri};
use httpio_backend::{CacheEntry, CacheStore};
use httpio_core::{Body, Context, Error, Middleware, Next, Request, Response, Result};
use tracing::{debug, warn};

use crate::config::CachePolicy;
use crate::freshness::{is_storable, request_wants_revalidation};
use crate::metrics::{self, Lookup};
use crate::{CacheConfig, ConfigError};

/// Serves GET and HEAD requests from a [`CacheStore`].
///
/// Requests with other methods, or whose URL the include/exclude rules
/// reject, pass straight through. For the rest:
///
/// 1. A fresh stored entry is returned without calling the rest of the chain.
/// 2. A stale entry, or any entry when the request carries `no-cache` and
///    `respect_cache_control` is on, is deleted and the request goes upstream.
/// 3. A storable upstream response is buffered, handed back with a fresh body
///    and written to the store in the background.
///
/// Store failures are logged and never fail the request. When a status header
/// is configured, responses on this path carry `HIT` or `MISS`.
#[derive(Clone)]
pub struct CacheMiddleware {
    store: Arc<dyn CacheStore>,
    policy: Arc<CachePolicy>,
}

impl CacheMiddleware {
    /// Creates a cache middleware over `store`.
    ///
    /// Fails when a URL pattern or the status header name is invalid.
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            store,
            policy: Arc::new(config.compile()?),
        })
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// The active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.policy.config
    }

    fn applies_to(&self, req: &Request) -> bool {
        self.policy.config.enabled
            && matches!(*req.method(), Method::GET | Method::HEAD)
            && self.policy.allows(req.uri())
    }

    fn tag(&self, mut response: Response, value: &'static str) -> Response {
        if let Some(name) = &self.policy.status_header {
            response
                .headers_mut()
                .insert(name.clone(), HeaderValue::from_static(value));
        }
        response
    }

    fn replay(&self, entry: CacheEntry) -> Response {
        let mut response = Response::new(Body::full(entry.body));
        *response.status_mut() = entry.status;
        *response.headers_mut() = entry.headers;
        self.tag(response, "HIT")
    }

    /// Buffers a storable response and schedules the write.
    async fn store_response(&self, key: String, uri: &Uri, response: Response) -> Result<Response> {
        let respect = self.policy.config.respect_cache_control;
        if !is_storable(response.status(), response.headers(), respect) {
            debug!(key = %key, status = response.status().as_u16(), "response not cacheable");
            return Ok(response);
        }

        let now = Utc::now();
        let expires_at = self.policy.expiration(uri, response.headers(), now);
        if expires_at <= now {
            debug!(key = %key, "response already expired, not caching");
            return Ok(response);
        }

        let (parts, body) = response.into_parts();
        let bytes: Bytes = body.collect_bytes().await.map_err(Error::body)?;
        let entry = CacheEntry::new(
            key.clone(),
            parts.status,
            parts.headers.clone(),
            bytes.clone(),
            uri.to_string(),
            expires_at,
        );
        self.write_behind(key, entry);

        Ok(Response::from_parts(parts, Body::full(bytes)))
    }

    fn write_behind(&self, key: String, entry: CacheEntry) {
        let store = self.store.clone();
        let write = async move {
            match store.set(&key, entry).await {
                Ok(()) => debug!(key = %key, "response cached"),
                Err(err) => {
                    warn!(key = %key, store = store.name(), error = %err, "cache write failed");
                    metrics::record_write_error(store.name());
                }
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(write);
            }
            Err(_) => debug!("no tokio runtime, skipping cache write"),
        }
    }
}

impl fmt::Debug for CacheMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheMiddleware")
            .field("store", &self.store.name())
            .field("config", &self.policy.config)
            .finish()
    }
}

#[async_trait]
impl Middleware for CacheMiddleware {
    async fn handle(&self, ctx: &Context, req: Request, next: Next<'_>) -> Result<Response> {
        if !self.applies_to(&req) {
            return next.run(ctx, req).await;
        }

        let (parts, body) = req.into_parts();
        let key = self.policy.config.key_strategy.key(&parts, &body);
        let bypass = self.policy.config.respect_cache_control
            && request_wants_revalidation(&parts.headers);
        let store_name = self.store.name();

        match self.store.get(&key).await {
            Ok(Some(entry)) if !bypass && !entry.is_expired() => {
                debug!(key = %key, "cache hit");
                metrics::record_lookup(store_name, Lookup::Hit);
                return Ok(self.replay(entry));
            }
            Ok(Some(_)) => {
                debug!(key = %key, bypass, "discarding stored entry");
                metrics::record_lookup(store_name, Lookup::Stale);
                if let Err(err) = self.store.delete(&key).await {
                    warn!(key = %key, error = %err, "failed to delete stale cache entry");
                }
            }
            Ok(None) => {}
            Err(err) => warn!(key = %key, error = %err, "cache lookup failed, treating as miss"),
        }

        debug!(key = %key, "cache miss");
        metrics::record_lookup(store_name, Lookup::Miss);
        let uri = parts.uri.clone();
        let response = next.run(ctx, Request::from_parts(parts, body)).await?;
        let response = self.store_response(key, &uri, response).await?;
        Ok(self.tag(response, "MISS"))
    }
}
