use thiserror::Error;

/// Invalid cache configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A URL pattern is not a valid regular expression.
    #[error("invalid URL pattern '{pattern}': {source}")]
    InvalidRegex {
        /// The offending pattern.
        pattern: String,
        /// Compilation error.
        #[source]
        source: regex::Error,
    },

    /// The status header name is not a valid header name.
    #[error("invalid status header name '{0}'")]
    InvalidHeaderName(String),
}
