#![warn(missing_docs)]
//! # httpio-stream
//!
//! Incremental decoders for long-lived HTTP response bodies.
//!
//! Every decoder reads from any [`tokio::io::AsyncRead`] and calls a handler
//! as data arrives, so a response can be consumed without buffering it.
//!
//! | Decoder | Handler receives |
//! |---|---|
//! | [`stream_raw`] | each chunk as read |
//! | [`stream_lines`] | each delimited line |
//! | [`stream_json`] | each NDJSON line as a [`RawValue`](serde_json::value::RawValue) |
//! | [`stream_into`] | each NDJSON line deserialized into `T` |
//! | [`stream_sse`] | each Server-Sent Event |
//!
//! A handler error stops the decoder and comes back unchanged inside
//! [`StreamError::Handler`].

mod decode;
mod error;
mod lines;
mod options;
pub mod sse;

pub use decode::{stream_into, stream_json, stream_lines, stream_raw};
pub use error::{BoxError, StreamError};
pub use lines::LineReader;
pub use options::{
    DEFAULT_BUFFER_SIZE, DEFAULT_MAX_LINE_LENGTH, Delimiter, SSE_MAX_LINE_LENGTH, StreamOptions,
};
pub use sse::{SseCallbacks, SseEvent, SseHandler, SseParser, stream_sse};
