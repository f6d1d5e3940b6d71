//! Chunk, line and JSON decoders.
//!
//! Each decoder drives a handler until the input ends or the handler fails.
//! A handler error stops decoding at once and is returned as
//! [`StreamError::Handler`].

use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::{BoxError, LineReader, StreamError, StreamOptions};

/// Forwards every non-empty chunk read from `reader` to `handler`.
///
/// Reads at most `options.buffer_size` bytes at a time.
pub async fn stream_raw<R, F, E>(
    mut reader: R,
    options: &StreamOptions,
    mut handler: F,
) -> Result<(), StreamError>
where
    R: AsyncRead + Unpin,
    F: FnMut(&[u8]) -> Result<(), E>,
    E: Into<BoxError>,
{
    let mut buf = vec![0u8; options.read_size()];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        handler(&buf[..n]).map_err(StreamError::handler)?;
    }
}

/// Calls `handler` with each line, delimiter removed.
///
/// See [`LineReader`] for the splitting rules.
pub async fn stream_lines<R, F, E>(
    reader: R,
    options: &StreamOptions,
    mut handler: F,
) -> Result<(), StreamError>
where
    R: AsyncRead + Unpin,
    F: FnMut(&[u8]) -> Result<(), E>,
    E: Into<BoxError>,
{
    let mut lines = LineReader::new(reader, options);
    while let Some(line) = lines.next_line().await? {
        handler(&line).map_err(StreamError::handler)?;
    }
    Ok(())
}

/// Calls `handler` with each line parsed as one JSON value (NDJSON).
///
/// Blank lines are skipped. A line that is not valid JSON stops the stream
/// with [`StreamError::Json`].
pub async fn stream_json<R, F, E>(
    reader: R,
    options: &StreamOptions,
    mut handler: F,
) -> Result<(), StreamError>
where
    R: AsyncRead + Unpin,
    F: FnMut(&RawValue) -> Result<(), E>,
    E: Into<BoxError>,
{
    let mut line_no = 0;
    let mut lines = LineReader::new(reader, options);
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim_ascii().is_empty() {
            continue;
        }
        let value: &RawValue = serde_json::from_slice(&line).map_err(|source| {
            trace!(line = line_no, "malformed JSON line");
            StreamError::Json {
                line: line_no,
                source,
            }
        })?;
        handler(value).map_err(StreamError::handler)?;
    }
    Ok(())
}

/// Decodes each NDJSON line into a fresh `T` before calling `handler`.
///
/// A line that does not deserialize into `T` stops the stream with
/// [`StreamError::Json`].
///
/// ```no_run
/// # async fn run(body: &[u8]) -> Result<(), httpio_stream::StreamError> {
/// use httpio_stream::{StreamOptions, stream_into};
///
/// #[derive(serde::Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// stream_into(body, &StreamOptions::default(), |user: User| {
///     println!("{} {}", user.id, user.name);
///     Ok::<_, std::io::Error>(())
/// })
/// .await
/// # }
/// ```
pub async fn stream_into<T, R, F, E>(
    reader: R,
    options: &StreamOptions,
    mut handler: F,
) -> Result<(), StreamError>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
    F: FnMut(T) -> Result<(), E>,
    E: Into<BoxError>,
{
    let mut line_no = 0;
    let mut lines = LineReader::new(reader, options);
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim_ascii().is_empty() {
            continue;
        }
        let item: T = serde_json::from_slice(&line).map_err(|source| StreamError::Json {
            line: line_no,
            source,
        })?;
        handler(item).map_err(StreamError::handler)?;
    }
    Ok(())
}
