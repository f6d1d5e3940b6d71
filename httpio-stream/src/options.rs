//! Decoder options.

use crate::StreamError;

/// Default read buffer size.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Default upper bound for one line.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Upper bound for one line of an event stream.
pub const SSE_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// How lines are separated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Delimiter {
    /// `\n`, with a trailing `\r` removed from each line.
    #[default]
    Newline,
    /// A single byte.
    Byte(u8),
    /// A byte sequence, matched exactly. An empty sequence splits like
    /// [`Delimiter::Newline`].
    Sequence(Vec<u8>),
}

impl Delimiter {
    /// The delimiter actually used for splitting. An empty sequence falls
    /// back to [`Delimiter::Newline`].
    pub(crate) fn effective(&self) -> Delimiter {
        match self {
            Delimiter::Sequence(seq) if seq.is_empty() => Delimiter::Newline,
            other => other.clone(),
        }
    }

    /// Length of the delimiter in bytes, at least 1.
    pub(crate) fn len(&self) -> usize {
        match self {
            Delimiter::Newline | Delimiter::Byte(_) => 1,
            Delimiter::Sequence(seq) => seq.len().max(1),
        }
    }

    /// Finds the first delimiter in `haystack` at or after `from`.
    pub(crate) fn find(&self, haystack: &[u8], from: usize) -> Option<usize> {
        let tail = haystack.get(from..)?;
        let found = match self {
            Delimiter::Byte(byte) => tail.iter().position(|b| b == byte),
            Delimiter::Sequence(seq) if !seq.is_empty() => {
                tail.windows(seq.len()).position(|w| w == seq.as_slice())
            }
            Delimiter::Newline | Delimiter::Sequence(_) => tail.iter().position(|b| *b == b'\n'),
        };
        found.map(|pos| pos + from)
    }
}

impl From<&str> for Delimiter {
    fn from(value: &str) -> Self {
        match value.as_bytes() {
            b"" | b"\n" => Delimiter::Newline,
            [byte] => Delimiter::Byte(*byte),
            seq => Delimiter::Sequence(seq.to_vec()),
        }
    }
}

impl From<u8> for Delimiter {
    fn from(value: u8) -> Self {
        if value == b'\n' {
            Delimiter::Newline
        } else {
            Delimiter::Byte(value)
        }
    }
}

/// Options shared by all decoders.
///
/// ```
/// use httpio_stream::StreamOptions;
///
/// let options = StreamOptions::new()
///     .with_delimiter("||")
///     .with_content_type("application/x-ndjson");
/// ```
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Bytes requested per read. Zero means [`DEFAULT_BUFFER_SIZE`].
    pub buffer_size: usize,

    /// Line separator for the line based decoders.
    pub delimiter: Delimiter,

    /// Required substring of the response `Content-Type`.
    pub content_type: Option<String>,

    /// Longest accepted line. Zero disables the limit.
    pub max_line_length: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            delimiter: Delimiter::Newline,
            content_type: None,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl StreamOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults for an event stream: `text/event-stream` content type and
    /// 1 MiB lines.
    pub fn sse() -> Self {
        Self {
            content_type: Some("text/event-stream".to_owned()),
            max_line_length: SSE_MAX_LINE_LENGTH,
            ..Self::default()
        }
    }

    /// Sets the read buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Splits lines on a string.
    pub fn with_delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = Delimiter::from(delimiter);
        self
    }

    /// Splits lines on a single byte.
    pub fn with_byte_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Delimiter::from(delimiter);
        self
    }

    /// Requires the response content type to contain `content_type`.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the longest accepted line.
    pub fn with_max_line_length(mut self, limit: usize) -> Self {
        self.max_line_length = limit;
        self
    }

    pub(crate) fn read_size(&self) -> usize {
        if self.buffer_size == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            self.buffer_size
        }
    }

    /// Checks a response `Content-Type` against the expected one.
    ///
    /// Passes when no content type is expected.
    pub fn check_content_type(&self, actual: Option<&str>) -> Result<(), StreamError> {
        let Some(expected) = &self.content_type else {
            return Ok(());
        };
        let actual = actual.unwrap_or_default();
        if actual.contains(expected.as_str()) {
            Ok(())
        } else {
            Err(StreamError::ContentType {
                expected: expected.clone(),
                actual: actual.to_owned(),
            })
        }
    }
}
