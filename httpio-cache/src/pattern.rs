//! URL matching rules.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A URL pattern as written in configuration.
///
/// ```yaml
/// include_patterns:
///   - "/api/"                      # substring
///   - regex: "^https://cdn\\.[a-z]+\\.com/"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UrlPattern {
    /// Matches URLs containing the string.
    Contains(String),
    /// Matches URLs the expression finds a match in.
    Regex {
        /// Regular expression source.
        regex: String,
    },
}

impl UrlPattern {
    /// A substring pattern.
    pub fn contains(needle: impl Into<String>) -> Self {
        UrlPattern::Contains(needle.into())
    }

    /// A regular expression pattern.
    pub fn regex(source: impl Into<String>) -> Self {
        UrlPattern::Regex {
            regex: source.into(),
        }
    }

    pub(crate) fn compile(&self) -> Result<Matcher, ConfigError> {
        match self {
            UrlPattern::Contains(needle) => Ok(Matcher::Contains(needle.clone())),
            UrlPattern::Regex { regex } => Regex::new(regex)
                .map(Matcher::Regex)
                .map_err(|source| ConfigError::InvalidRegex {
                    pattern: regex.clone(),
                    source,
                }),
        }
    }
}

impl From<&str> for UrlPattern {
    fn from(value: &str) -> Self {
        UrlPattern::Contains(value.to_owned())
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Matcher {
    Contains(String),
    Regex(Regex),
}

impl Matcher {
    pub(crate) fn is_match(&self, url: &str) -> bool {
        match self {
            Matcher::Contains(needle) => url.contains(needle.as_str()),
            Matcher::Regex(regex) => regex.is_match(url),
        }
    }
}

/// Compiled include/exclude rules.
#[derive(Debug, Clone, Default)]
pub(crate) struct UrlRules {
    include: Vec<Matcher>,
    exclude: Vec<Matcher>,
    exclude_hosts: Vec<String>,
}

impl UrlRules {
    pub(crate) fn compile(
        include: &[UrlPattern],
        exclude: &[UrlPattern],
        exclude_hosts: &[String],
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            include: include.iter().map(UrlPattern::compile).collect::<Result<_, _>>()?,
            exclude: exclude.iter().map(UrlPattern::compile).collect::<Result<_, _>>()?,
            exclude_hosts: exclude_hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
        })
    }

    /// Exclusions win; an empty include list admits everything else.
    pub(crate) fn allows(&self, url: &str, host: Option<&str>) -> bool {
        if self.exclude.iter().any(|m| m.is_match(url)) {
            return false;
        }
        if let Some(host) = host
            && self.exclude_hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
        {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|m| m.is_match(url))
    }
}
