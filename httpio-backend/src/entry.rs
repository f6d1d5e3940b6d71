use bincode::{
    config::standard as bincode_config,
    serde::{decode_from_slice, encode_to_vec},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{StoreError, StoreResult};

/// A cached response.
///
/// `expires_at` is fixed when the entry is written. Stores only move
/// `last_accessed` forward; everything else changes only through a new `set`.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Cache key the entry was stored under.
    pub key: String,
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Fully buffered response body.
    pub body: Bytes,
    /// URL of the request that produced the response.
    pub request_url: String,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
    /// When the entry was last read.
    pub last_accessed: DateTime<Utc>,
    /// When the entry stops being fresh.
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(
        key: impl Into<String>,
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
        request_url: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            status,
            headers,
            body,
            request_url: request_url.into(),
            created_at: now,
            last_accessed: now,
            expires_at,
        }
    }

    /// Whether the entry is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the entry is expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Records a read.
    pub fn touch(&mut self) {
        self.last_accessed = Utc::now();
    }

    /// Serializes the entry for persistent stores.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        let stored = StoredEntry::from(self);
        Ok(encode_to_vec(&stored, bincode_config())?)
    }

    /// Restores an entry written by [`CacheEntry::encode`].
    pub fn decode(data: &[u8]) -> StoreResult<Self> {
        let (stored, _): (StoredEntry, usize) = decode_from_slice(data, bincode_config())?;
        stored.try_into()
    }
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    status: u16,
    headers: Vec<(String, Vec<u8>)>,
    #[serde(with = "serde_bytes")]
    body: Vec<u8>,
    request_url: String,
    created_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<&CacheEntry> for StoredEntry {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            key: entry.key.clone(),
            status: entry.status.as_u16(),
            headers: entry
                .headers
                .iter()
                .map(|(name, value)| (name.as_str().to_owned(), value.as_bytes().to_vec()))
                .collect(),
            body: entry.body.to_vec(),
            request_url: entry.request_url.clone(),
            created_at: entry.created_at,
            last_accessed: entry.last_accessed,
            expires_at: entry.expires_at,
        }
    }
}

impl TryFrom<StoredEntry> for CacheEntry {
    type Error = StoreError;

    fn try_from(stored: StoredEntry) -> Result<Self, Self::Error> {
        let status = StatusCode::from_u16(stored.status)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let mut headers = HeaderMap::with_capacity(stored.headers.len());
        for (name, value) in stored.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| StoreError::Corrupt(e.to_string()))?;
            let value =
                HeaderValue::from_bytes(&value).map_err(|e| StoreError::Corrupt(e.to_string()))?;
            headers.append(name, value);
        }
        Ok(Self {
            key: stored.key,
            status,
            headers,
            body: Bytes::from(stored.body),
            request_url: stored.request_url,
            created_at: stored.created_at,
            last_accessed: stored.last_accessed,
            expires_at: stored.expires_at,
        })
    }
}
