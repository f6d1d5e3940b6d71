use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use http::{HeaderMap, StatusCode};
use httpio_backend::{CacheEntry, CacheStore, StoreResult};
use tokio::sync::Mutex;

#[derive(Default)]
struct MapStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

#[async_trait]
impl CacheStore for MapStore {
    async fn get(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.touch();
                Ok(Some(entry.clone()))
            }
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> StoreResult<()> {
        self.entries.lock().await.insert(key.to_owned(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        self.entries.lock().await.clear();
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "map"
    }
}

fn entry(key: &str, ttl: Duration) -> CacheEntry {
    CacheEntry::new(
        key,
        StatusCode::OK,
        HeaderMap::new(),
        Bytes::from_static(b"body"),
        "https://example.com/",
        Utc::now() + ttl,
    )
}

#[tokio::test]
async fn shared_store_forwards_calls() {
    let store: Arc<dyn CacheStore> = Arc::new(MapStore::default());
    assert_eq!(store.name(), "map");

    store.set("k", entry("k", Duration::minutes(1))).await.unwrap();
    let hit = store.get("k").await.unwrap().unwrap();
    assert_eq!(hit.body, Bytes::from_static(b"body"));
    assert!(hit.last_accessed >= hit.created_at);

    store.delete("k").await.unwrap();
    assert!(store.get("k").await.unwrap().is_none());
}

#[tokio::test]
async fn copies_do_not_alias_stored_entries() {
    let store: Box<dyn CacheStore> = Box::new(MapStore::default());
    store.set("k", entry("k", Duration::minutes(1))).await.unwrap();

    let mut copy = store.get("k").await.unwrap().unwrap();
    copy.body = Bytes::from_static(b"tampered");

    let again = store.get("k").await.unwrap().unwrap();
    assert_eq!(again.body, Bytes::from_static(b"body"));
}

#[tokio::test]
async fn expired_entries_are_not_returned() {
    let store = MapStore::default();
    store
        .set("k", entry("k", Duration::seconds(-1)))
        .await
        .unwrap();
    assert!(store.get("k").await.unwrap().is_none());
    assert!(store.entries.lock().await.is_empty());
}
