//! Cache configuration.

use std::time::Duration;

use chrono::{DateTime, Utc};
use http::{HeaderName, Uri};
use serde::{Deserialize, Serialize};

use crate::freshness;
use crate::pattern::{UrlPattern, UrlRules};
use crate::{ConfigError, KeyStrategy};

/// Default freshness lifetime when a response names none.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Default interval between expiry sweeps in stores.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Default header carrying `HIT` or `MISS`.
pub const DEFAULT_STATUS_HEADER: &str = "x-cache-status";

/// A lifetime override for matching requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlRule {
    /// Exact host for domain rules, path substring for path rules.
    pub pattern: String,
    /// Lifetime applied on a match (e.g. `"5m"`, `"1h 30m"`).
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

/// Configuration of the response cache.
///
/// Deserializes from any serde format; missing fields take their defaults.
///
/// ```yaml
/// default_ttl: 5m
/// key_strategy: method_url
/// exclude_patterns: ["/auth/"]
/// path_ttl:
///   - pattern: /static/
///     ttl: 1h
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch.
    pub enabled: bool,

    /// Lifetime used when neither the response nor a TTL rule gives one.
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,

    /// Honour request `no-cache` and response `no-store`/`no-cache`/`private`.
    pub respect_cache_control: bool,

    /// When non-empty, only matching URLs are cached.
    pub include_patterns: Vec<UrlPattern>,

    /// Matching URLs are never cached.
    pub exclude_patterns: Vec<UrlPattern>,

    /// Hosts that are never cached.
    pub exclude_hosts: Vec<String>,

    /// How cache keys are derived.
    pub key_strategy: KeyStrategy,

    /// Sweep interval handed to stores built from this configuration.
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,

    /// Per-host lifetimes, matched exactly.
    pub domain_ttl: Vec<TtlRule>,

    /// Per-path lifetimes, first substring match wins.
    pub path_ttl: Vec<TtlRule>,

    /// Header set to `HIT` or `MISS` on cached paths. `None` disables it.
    pub status_header: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl: DEFAULT_TTL,
            respect_cache_control: true,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            exclude_hosts: Vec::new(),
            key_strategy: KeyStrategy::default(),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            domain_ttl: Vec::new(),
            path_ttl: Vec::new(),
            status_header: Some(DEFAULT_STATUS_HEADER.to_owned()),
        }
    }
}

impl CacheConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns caching on or off.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the default lifetime.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets whether `Cache-Control` is honoured.
    pub fn with_respect_cache_control(mut self, respect: bool) -> Self {
        self.respect_cache_control = respect;
        self
    }

    /// Replaces the include patterns.
    pub fn with_include_patterns<I, P>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<UrlPattern>,
    {
        self.include_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the exclude patterns.
    pub fn with_exclude_patterns<I, P>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<UrlPattern>,
    {
        self.exclude_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the excluded hosts.
    pub fn with_exclude_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the key strategy.
    pub fn with_key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.key_strategy = strategy;
        self
    }

    /// Sets the store sweep interval.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Adds a lifetime for one host.
    pub fn with_domain_ttl(mut self, host: impl Into<String>, ttl: Duration) -> Self {
        self.domain_ttl.push(TtlRule {
            pattern: host.into(),
            ttl,
        });
        self
    }

    /// Adds a lifetime for paths containing `pattern`.
    pub fn with_path_ttl(mut self, pattern: impl Into<String>, ttl: Duration) -> Self {
        self.path_ttl.push(TtlRule {
            pattern: pattern.into(),
            ttl,
        });
        self
    }

    /// Sets or disables the status header.
    pub fn with_status_header(mut self, header: Option<&str>) -> Self {
        self.status_header = header.map(str::to_owned);
        self
    }

    pub(crate) fn compile(self) -> Result<CachePolicy, ConfigError> {
        let rules = UrlRules::compile(
            &self.include_patterns,
            &self.exclude_patterns,
            &self.exclude_hosts,
        )?;
        let status_header = self
            .status_header
            .as_deref()
            .map(|name| {
                HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| ConfigError::InvalidHeaderName(name.to_owned()))
            })
            .transpose()?;
        Ok(CachePolicy {
            rules,
            status_header,
            config: self,
        })
    }
}

/// A validated configuration, ready for the request path.
#[derive(Debug)]
pub(crate) struct CachePolicy {
    pub(crate) config: CacheConfig,
    pub(crate) rules: UrlRules,
    pub(crate) status_header: Option<HeaderName>,
}

impl CachePolicy {
    pub(crate) fn allows(&self, uri: &Uri) -> bool {
        self.rules.allows(&uri.to_string(), uri.host())
    }

    /// Lifetime for responses without their own: path rules, then domain
    /// rules, then the default.
    pub(crate) fn fallback_ttl(&self, uri: &Uri) -> Duration {
        let path = uri.path();
        if let Some(rule) = self.config.path_ttl.iter().find(|r| path.contains(&r.pattern)) {
            return rule.ttl;
        }
        if let Some(host) = uri.host()
            && let Some(rule) = self
                .config
                .domain_ttl
                .iter()
                .find(|r| r.pattern.eq_ignore_ascii_case(host))
        {
            return rule.ttl;
        }
        self.config.default_ttl
    }

    pub(crate) fn expiration(
        &self,
        uri: &Uri,
        headers: &http::HeaderMap,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        freshness::expiration(headers, now, self.fallback_ttl(uri))
    }
}
