use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use http::{HeaderMap, Method, StatusCode};
use httpio_backend::{CacheEntry, CacheStore, StoreError, StoreResult};
use httpio_cache::{CacheConfig, CacheMiddleware, KeyStrategy};
use httpio_core::{Body, Chain, Context, Request, Response, Transport, transport_fn};
use httpio_memory::MemoryStore;

const URL: &str = "http://api.test/users/1";

fn memory() -> MemoryStore {
    MemoryStore::builder().capacity(16).without_cleanup().build()
}

/// Upstream answering with a fixed status, headers and body.
fn origin(
    calls: Arc<AtomicUsize>,
    status: StatusCode,
    headers: &'static [(&'static str, &'static str)],
    body: &'static str,
) -> impl Transport {
    transport_fn(move |_ctx, _req| {
        calls.fetch_add(1, Ordering::SeqCst);
        let mut res = Response::new(Body::from(body));
        *res.status_mut() = status;
        for (name, value) in headers {
            res.headers_mut().insert(*name, value.parse().unwrap());
        }
        async move { Ok(res) }
    })
}

fn request(method: Method, uri: &str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Waits for background writes to land.
async fn settle(store: &MemoryStore, entries: usize) {
    for _ in 0..100 {
        if store.len() >= entries {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("cache write did not complete");
}

async fn body(res: Response) -> Bytes {
    res.into_body().collect_bytes().await.unwrap()
}

fn chain(store: &MemoryStore, config: CacheConfig, upstream: impl Transport + 'static) -> Chain {
    let cache = CacheMiddleware::new(Arc::new(store.clone()), config).unwrap();
    Chain::new(upstream).with(cache)
}

#[tokio::test]
async fn second_get_is_served_from_cache() {
    let calls = Arc::new(AtomicUsize::new(0));
    let store = memory();
    let chain = chain(
        &store,
        CacheConfig::default(),
        origin(calls.clone(), StatusCode::OK, &[("content-type", "application/json")], "{\"id\":1}"),
    );
    let ctx = Context::new();

    let first = chain.execute(&ctx, request(Method::GET, URL)).await.unwrap();
    assert_eq!(first.headers()["x-cache-status"], "MISS");
    assert_eq!(body(first).await, "{\"id\":1}");
    settle(&store, 1).await;

    let second = chain.execute(&ctx, request(Method::GET, URL)).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers()["x-cache-status"], "HIT");
    assert_eq!(second.headers()["content-type"], "application/json");
    assert_eq!(body(second).await, "{\"id\":1}");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn post_passes_through_untouched() {
    let calls = Arc::new(AtomicUsize::new(0));
    let store = memory();
    let chain = chain(&store, CacheConfig::default(), origin(calls.clone(), StatusCode::OK, &[], "ok"));
    let ctx = Context::new();

    for _ in 0..2 {
        let res = chain.execute(&ctx, request(Method::POST, URL)).await.unwrap();
        assert!(res.headers().get("x-cache-status").is_none());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(store.is_empty());
}

#[tokio::test]
async fn request_no_cache_discards_the_stored_entry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let store = memory();
    let chain = chain(&store, CacheConfig::default(), origin(calls.clone(), StatusCode::OK, &[], "ok"));
    let ctx = Context::new();

    chain.execute(&ctx, request(Method::GET, URL)).await.unwrap();
    settle(&store, 1).await;

    let mut revalidate = request(Method::GET, URL);
    revalidate
        .headers_mut()
        .insert("cache-control", "no-cache".parse().unwrap());
    let res = chain.execute(&ctx, revalidate).await.unwrap();
    assert_eq!(res.headers()["x-cache-status"], "MISS");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn no_store_and_error_responses_are_not_cached() {
    let store = memory();
    let ctx = Context::new();

    let calls = Arc::new(AtomicUsize::new(0));
    let no_store = chain(
        &store,
        CacheConfig::default(),
        origin(calls.clone(), StatusCode::OK, &[("cache-control", "no-store")], "secret"),
    );
    no_store.execute(&ctx, request(Method::GET, URL)).await.unwrap();
    no_store.execute(&ctx, request(Method::GET, URL)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let calls = Arc::new(AtomicUsize::new(0));
    let failing = chain(
        &store,
        CacheConfig::default(),
        origin(calls.clone(), StatusCode::INTERNAL_SERVER_ERROR, &[], "boom"),
    );
    failing.execute(&ctx, request(Method::GET, URL)).await.unwrap();
    failing.execute(&ctx, request(Method::GET, URL)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    tokio::task::yield_now().await;
    assert!(store.is_empty());
}

#[tokio::test]
async fn expired_entry_is_replaced() {
    let calls = Arc::new(AtomicUsize::new(0));
    let store = memory();
    let key = format!("GET:{URL}");
    let stale = CacheEntry::new(
        key.clone(),
        StatusCode::OK,
        HeaderMap::new(),
        Bytes::from("old"),
        URL,
        Utc::now() - chrono::Duration::seconds(5),
    );
    store.set(&key, stale).await.unwrap();

    let chain = chain(&store, CacheConfig::default(), origin(calls.clone(), StatusCode::OK, &[], "new"));
    let res = chain.execute(&Context::new(), request(Method::GET, URL)).await.unwrap();
    assert_eq!(body(res).await, "new");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    settle(&store, 1).await;
    let entry = store.get(&key).await.unwrap().unwrap();
    assert_eq!(entry.body, "new");
    assert!(entry.expires_at > Utc::now());
}

#[tokio::test]
async fn excluded_urls_are_not_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let store = memory();
    let config = CacheConfig::new().with_exclude_patterns(["/users/"]);
    let chain = chain(&store, config, origin(calls.clone(), StatusCode::OK, &[], "ok"));
    let ctx = Context::new();

    chain.execute(&ctx, request(Method::GET, URL)).await.unwrap();
    chain.execute(&ctx, request(Method::GET, URL)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn get_and_head_use_separate_entries_by_default() {
    let calls = Arc::new(AtomicUsize::new(0));
    let store = memory();
    let chain = chain(&store, CacheConfig::default(), origin(calls.clone(), StatusCode::OK, &[], "ok"));
    let ctx = Context::new();

    chain.execute(&ctx, request(Method::GET, URL)).await.unwrap();
    settle(&store, 1).await;
    let head = chain.execute(&ctx, request(Method::HEAD, URL)).await.unwrap();
    assert_eq!(head.headers()["x-cache-status"], "MISS");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn url_only_keys_share_entries_across_methods() {
    let calls = Arc::new(AtomicUsize::new(0));
    let store = memory();
    let config = CacheConfig::new().with_key_strategy(KeyStrategy::UrlOnly);
    let chain = chain(&store, config, origin(calls.clone(), StatusCode::OK, &[], "ok"));
    let ctx = Context::new();

    chain.execute(&ctx, request(Method::GET, URL)).await.unwrap();
    settle(&store, 1).await;
    let head = chain.execute(&ctx, request(Method::HEAD, URL)).await.unwrap();
    assert_eq!(head.headers()["x-cache-status"], "HIT");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn streaming_upstream_body_is_buffered_for_the_caller() {
    let store = memory();
    let upstream = transport_fn(|_ctx, _req| async {
        let chunks: Vec<Result<Bytes, std::io::Error>> =
            vec![Ok(Bytes::from("chunk-1,")), Ok(Bytes::from("chunk-2"))];
        Ok(Response::new(Body::from_stream(futures::stream::iter(chunks))))
    });
    let chain = chain(&store, CacheConfig::default(), upstream);

    let res = chain.execute(&Context::new(), request(Method::GET, URL)).await.unwrap();
    assert!(res.body().as_bytes().is_some());
    assert_eq!(body(res).await, "chunk-1,chunk-2");
    settle(&store, 1).await;
}

/// A store that fails every operation.
struct BrokenStore;

#[async_trait]
impl CacheStore for BrokenStore {
    async fn get(&self, _key: &str) -> StoreResult<Option<CacheEntry>> {
        Err(StoreError::Closed)
    }

    async fn set(&self, _key: &str, _entry: CacheEntry) -> StoreResult<()> {
        Err(StoreError::Closed)
    }

    async fn delete(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::Closed)
    }

    async fn clear(&self) -> StoreResult<()> {
        Err(StoreError::Closed)
    }

    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn store_failures_never_fail_the_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = CacheMiddleware::new(Arc::new(BrokenStore), CacheConfig::default()).unwrap();
    let chain = Chain::new(origin(calls.clone(), StatusCode::OK, &[], "ok")).with(cache);

    let res = chain.execute(&Context::new(), request(Method::GET, URL)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res).await, "ok");
    tokio::task::yield_now().await;
}

#[tokio::test]
async fn disabled_cache_adds_no_header() {
    let calls = Arc::new(AtomicUsize::new(0));
    let store = memory();
    let chain = chain(
        &store,
        CacheConfig::new().with_enabled(false),
        origin(calls.clone(), StatusCode::OK, &[], "ok"),
    );
    let res = chain.execute(&Context::new(), request(Method::GET, URL)).await.unwrap();
    assert!(res.headers().get("x-cache-status").is_none());
}
