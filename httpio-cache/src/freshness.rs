//! `Cache-Control`, `Pragma` and `Expires` handling.

use std::time::Duration;

use chrono::{DateTime, Utc};
use http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use http::{HeaderMap, StatusCode};

/// Statuses whose responses may be stored.
pub const CACHEABLE_STATUSES: [StatusCode; 8] = [
    StatusCode::OK,
    StatusCode::NON_AUTHORITATIVE_INFORMATION,
    StatusCode::NO_CONTENT,
    StatusCode::PARTIAL_CONTENT,
    StatusCode::MULTIPLE_CHOICES,
    StatusCode::MOVED_PERMANENTLY,
    StatusCode::NOT_FOUND,
    StatusCode::GONE,
];

/// Iterates over the directives of every `Cache-Control` header.
fn directives(headers: &HeaderMap) -> impl Iterator<Item = &str> {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
}

fn has_directive(headers: &HeaderMap, name: &str) -> bool {
    directives(headers).any(|directive| directive.eq_ignore_ascii_case(name))
}

/// Whether the request asks to bypass stored responses
/// (`Cache-Control: no-cache` or `Pragma: no-cache`).
pub fn request_wants_revalidation(headers: &HeaderMap) -> bool {
    has_directive(headers, "no-cache")
        || headers
            .get_all(PRAGMA)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .any(|value| value.trim().eq_ignore_ascii_case("no-cache"))
}

/// Whether a response may be stored.
///
/// The status must be in [`CACHEABLE_STATUSES`]. With
/// `respect_cache_control`, `no-store`, `no-cache` and `private` veto storage.
pub fn is_storable(status: StatusCode, headers: &HeaderMap, respect_cache_control: bool) -> bool {
    if !CACHEABLE_STATUSES.contains(&status) {
        return false;
    }
    if respect_cache_control {
        return !directives(headers).any(|directive| {
            ["no-store", "no-cache", "private"]
                .iter()
                .any(|veto| directive.eq_ignore_ascii_case(veto))
        });
    }
    true
}

/// The `max-age` directive of a response, if present and valid.
pub fn max_age(headers: &HeaderMap) -> Option<Duration> {
    directives(headers).find_map(|directive| {
        let (name, value) = directive.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("max-age") {
            return None;
        }
        value.trim().trim_matches('"').parse().ok().map(Duration::from_secs)
    })
}

/// The `Expires` header of a response, if it is a valid HTTP date.
pub fn expires(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let value = headers.get(EXPIRES)?.to_str().ok()?;
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

/// When a response stored at `now` stops being fresh.
///
/// `max-age` wins over `Expires`; without either, `fallback` applies.
pub fn expiration(headers: &HeaderMap, now: DateTime<Utc>, fallback: Duration) -> DateTime<Utc> {
    if let Some(age) = max_age(headers) {
        return add(now, age);
    }
    if let Some(date) = expires(headers) {
        return date;
    }
    add(now, fallback)
}

fn add(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn request_no_cache_from_either_header() {
        assert!(request_wants_revalidation(&headers(&[("cache-control", "max-age=0, no-cache")])));
        assert!(request_wants_revalidation(&headers(&[("pragma", "no-cache")])));
        assert!(!request_wants_revalidation(&headers(&[("cache-control", "max-age=60")])));
    }

    #[test]
    fn storable_statuses_and_vetoes() {
        let none = HeaderMap::new();
        assert!(is_storable(StatusCode::OK, &none, true));
        assert!(is_storable(StatusCode::GONE, &none, true));
        assert!(!is_storable(StatusCode::CREATED, &none, true));
        assert!(!is_storable(StatusCode::INTERNAL_SERVER_ERROR, &none, true));

        let private = headers(&[("cache-control", "private, max-age=60")]);
        assert!(!is_storable(StatusCode::OK, &private, true));
        assert!(is_storable(StatusCode::OK, &private, false));
        assert!(!is_storable(StatusCode::OK, &headers(&[("cache-control", "No-Store")]), true));
    }

    #[test]
    fn max_age_beats_expires_beats_fallback() {
        let now = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let fallback = Duration::from_secs(600);

        let both = headers(&[
            ("cache-control", "public, max-age=30"),
            ("expires", "Tue, 02 Jan 2024 00:00:00 GMT"),
        ]);
        assert_eq!(expiration(&both, now, fallback), now + chrono::Duration::seconds(30));

        let only_expires = headers(&[("expires", "Tue, 02 Jan 2024 00:00:00 GMT")]);
        assert_eq!(
            expiration(&only_expires, now, fallback),
            now + chrono::Duration::days(1)
        );

        let garbage = headers(&[("cache-control", "max-age=soon"), ("expires", "0")]);
        assert_eq!(expiration(&garbage, now, fallback), now + chrono::Duration::minutes(10));
    }
}
