use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Delimiter, StreamError, StreamOptions};

/// Splits an [`AsyncRead`] into delimited lines.
///
/// Lines are returned without their delimiter. With [`Delimiter::Newline`]
/// a trailing `\r` is removed as well, so CRLF input reads like LF input.
/// Trailing bytes without a final delimiter form the last line.
#[derive(Debug)]
pub struct LineReader<R> {
    reader: R,
    buf: BytesMut,
    delimiter: Delimiter,
    read_size: usize,
    max_line_length: usize,
    /// Bytes at the front of `buf` already known to hold no delimiter.
    scanned: usize,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Creates a line reader configured by `options`.
    pub fn new(reader: R, options: &StreamOptions) -> Self {
        Self {
            reader,
            buf: BytesMut::new(),
            delimiter: options.delimiter.effective(),
            read_size: options.read_size(),
            max_line_length: options.max_line_length,
            scanned: 0,
            eof: false,
        }
    }

    /// Reads the next line, or `None` at the end of the input.
    pub async fn next_line(&mut self) -> Result<Option<Bytes>, StreamError> {
        loop {
            if let Some(end) = self.delimiter.find(&self.buf, self.scanned) {
                self.check_length(end)?;
                let mut line = self.buf.split_to(end + self.delimiter.len());
                line.truncate(end);
                self.scanned = 0;
                return Ok(Some(self.finish(line)));
            }
            self.check_length(self.buf.len())?;

            if self.eof {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let line = self.buf.split();
                self.scanned = 0;
                return Ok(Some(self.finish(line)));
            }

            // A delimiter may straddle the boundary of the next read.
            self.scanned = self.buf.len().saturating_sub(self.delimiter.len() - 1);
            self.buf.reserve(self.read_size);
            if self.reader.read_buf(&mut self.buf).await? == 0 {
                self.eof = true;
            }
        }
    }

    /// Consumes the reader, returning the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn check_length(&self, len: usize) -> Result<(), StreamError> {
        if self.max_line_length > 0 && len > self.max_line_length {
            return Err(StreamError::LineTooLong {
                limit: self.max_line_length,
            });
        }
        Ok(())
    }

    fn finish(&self, mut line: BytesMut) -> Bytes {
        if self.delimiter == Delimiter::Newline && line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        line.freeze()
    }
}
