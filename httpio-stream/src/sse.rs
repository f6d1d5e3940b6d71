//! Server-Sent Events decoding.
//!
//! The stream is read line by line. `event`, `data`, `id` and `retry` fields
//! accumulate until a blank line, which dispatches one [`SseEvent`] when any
//! `data` field was seen and then starts the next event from blank fields.
//! Comment lines (starting with `:`) and unknown fields are ignored. A
//! pending event is dispatched when the stream ends without a final blank
//! line.

use std::fmt;

use tokio::io::AsyncRead;
use tracing::trace;

use crate::{BoxError, LineReader, StreamError, StreamOptions};

/// Event type used when the stream does not name one.
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// One dispatched event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `id` field, empty when absent.
    pub id: String,
    /// Value of the `event` field, `"message"` when absent.
    pub event: String,
    /// All `data` fields joined with `\n`.
    pub data: String,
    /// Reconnection delay in milliseconds, 0 when absent or invalid.
    pub retry: u64,
}

/// Receives decoded events.
///
/// Only [`on_event`](SseHandler::on_event) is required. `on_open` runs before
/// the first read and `on_close` after the stream ends or fails; both default
/// to doing nothing. Any closure `FnMut(SseEvent) -> Result<(), BoxError>` is
/// a handler.
pub trait SseHandler {
    /// Handles one event. An error stops the stream.
    fn on_event(&mut self, event: SseEvent) -> Result<(), BoxError>;

    /// Called before reading. An error stops the stream before any read.
    fn on_open(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called once reading has stopped, whatever the reason.
    fn on_close(&mut self) {}
}

impl<F> SseHandler for F
where
    F: FnMut(SseEvent) -> Result<(), BoxError>,
{
    fn on_event(&mut self, event: SseEvent) -> Result<(), BoxError> {
        self(event)
    }
}

type EventFn<'a> = Box<dyn FnMut(SseEvent) -> Result<(), BoxError> + Send + 'a>;
type OpenFn<'a> = Box<dyn FnMut() -> Result<(), BoxError> + Send + 'a>;
type CloseFn<'a> = Box<dyn FnMut() + Send + 'a>;

/// A handler assembled from closures, with optional lifecycle callbacks.
///
/// ```
/// use httpio_stream::SseCallbacks;
///
/// let handler = SseCallbacks::new(|event| {
///     println!("{}: {}", event.event, event.data);
///     Ok(())
/// })
/// .on_open(|| Ok(()))
/// .on_close(|| println!("stream closed"));
/// ```
pub struct SseCallbacks<'a> {
    on_event: EventFn<'a>,
    on_open: Option<OpenFn<'a>>,
    on_close: Option<CloseFn<'a>>,
}

impl<'a> SseCallbacks<'a> {
    /// Creates a handler from an event callback.
    pub fn new<F>(on_event: F) -> Self
    where
        F: FnMut(SseEvent) -> Result<(), BoxError> + Send + 'a,
    {
        Self {
            on_event: Box::new(on_event),
            on_open: None,
            on_close: None,
        }
    }

    /// Sets the callback run before reading.
    pub fn on_open<F>(mut self, on_open: F) -> Self
    where
        F: FnMut() -> Result<(), BoxError> + Send + 'a,
    {
        self.on_open = Some(Box::new(on_open));
        self
    }

    /// Sets the callback run after reading stops.
    pub fn on_close<F>(mut self, on_close: F) -> Self
    where
        F: FnMut() + Send + 'a,
    {
        self.on_close = Some(Box::new(on_close));
        self
    }
}

impl SseHandler for SseCallbacks<'_> {
    fn on_event(&mut self, event: SseEvent) -> Result<(), BoxError> {
        (self.on_event)(event)
    }

    fn on_open(&mut self) -> Result<(), BoxError> {
        match &mut self.on_open {
            Some(on_open) => on_open(),
            None => Ok(()),
        }
    }

    fn on_close(&mut self) {
        if let Some(on_close) = &mut self.on_close {
            on_close();
        }
    }
}

impl fmt::Debug for SseCallbacks<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseCallbacks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .finish()
    }
}

/// Line-level event parser.
///
/// Feed it lines without their terminator; it returns an event whenever a
/// blank line completes one. Call [`finish`](SseParser::finish) at the end of
/// input to flush a pending event.
#[derive(Debug, Default)]
pub struct SseParser {
    id: String,
    event: String,
    data: String,
    retry: u64,
    has_data: bool,
}

impl SseParser {
    /// Creates a parser with no pending event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes one line.
    pub fn feed(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = value.to_owned(),
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "id" => self.id = value.to_owned(),
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(retry) = value.parse() {
                        self.retry = retry;
                    }
                } else {
                    trace!(value, "ignoring invalid retry field");
                }
            }
            _ => trace!(field, "ignoring unknown field"),
        }
        None
    }

    /// Flushes the pending event at the end of input.
    pub fn finish(&mut self) -> Option<SseEvent> {
        self.dispatch()
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let pending = std::mem::take(self);
        if !pending.has_data {
            return None;
        }
        let event = if pending.event.is_empty() {
            DEFAULT_EVENT_TYPE.to_owned()
        } else {
            pending.event
        };
        Some(SseEvent {
            id: pending.id,
            event,
            data: pending.data,
            retry: pending.retry,
        })
    }
}

/// Decodes an event stream, calling `handler` for each event.
///
/// Lines longer than `options.max_line_length` stop the stream; use
/// [`StreamOptions::sse`] for the usual 1 MiB limit. Invalid UTF-8 is
/// replaced rather than rejected.
pub async fn stream_sse<R, H>(
    reader: R,
    options: &StreamOptions,
    handler: &mut H,
) -> Result<(), StreamError>
where
    R: AsyncRead + Unpin,
    H: SseHandler + ?Sized,
{
    handler.on_open().map_err(StreamError::Handler)?;
    let result = drive(reader, options, handler).await;
    handler.on_close();
    result
}

async fn drive<R, H>(reader: R, options: &StreamOptions, handler: &mut H) -> Result<(), StreamError>
where
    R: AsyncRead + Unpin,
    H: SseHandler + ?Sized,
{
    let mut lines = LineReader::new(reader, options);
    let mut parser = SseParser::new();
    while let Some(line) = lines.next_line().await? {
        if let Some(event) = parser.feed(&String::from_utf8_lossy(&line)) {
            handler.on_event(event).map_err(StreamError::Handler)?;
        }
    }
    if let Some(event) = parser.finish() {
        handler.on_event(event).map_err(StreamError::Handler)?;
    }
    Ok(())
}
