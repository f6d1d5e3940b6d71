//! Cache key derivation.

use http::request::Parts;
use httpio_core::Body;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Request bodies at or above this size are left out of full-request keys.
pub const MAX_HASHED_BODY: usize = 1024 * 1024;

/// How a request is turned into a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// `"{METHOD}:{url}"`.
    #[default]
    MethodUrl,
    /// The URL alone, so GET and HEAD share entries.
    UrlOnly,
    /// SHA-256 over method, URL, sorted headers and a small buffered body.
    FullRequest,
}

impl KeyStrategy {
    /// Derives the key for a request.
    pub fn key(&self, parts: &Parts, body: &Body) -> String {
        match self {
            KeyStrategy::MethodUrl => format!("{}:{}", parts.method, parts.uri),
            KeyStrategy::UrlOnly => parts.uri.to_string(),
            KeyStrategy::FullRequest => full_request_key(parts, body),
        }
    }
}

fn full_request_key(parts: &Parts, body: &Body) -> String {
    let mut hasher = Sha256::new();
    update_framed(&mut hasher, parts.method.as_str().as_bytes());
    update_framed(&mut hasher, parts.uri.to_string().as_bytes());

    let mut names: Vec<&str> = parts.headers.keys().map(|name| name.as_str()).collect();
    names.sort_unstable();
    for name in names {
        update_framed(&mut hasher, name.as_bytes());
        for value in parts.headers.get_all(name) {
            update_framed(&mut hasher, value.as_bytes());
        }
    }

    if let Some(bytes) = body.as_bytes()
        && bytes.len() < MAX_HASHED_BODY
    {
        hasher.update(bytes);
    }

    hex::encode(hasher.finalize())
}

/// Hashes `field` behind its length so adjacent fields cannot run together.
fn update_framed(hasher: &mut Sha256, field: &[u8]) {
    hasher.update((field.len() as u64).to_be_bytes());
    hasher.update(field);
}
