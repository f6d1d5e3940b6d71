//! Request and response bodies.
//!
//! A [`Body`] is either fully buffered ([`Body::Full`]) or a boxed
//! [`http_body::Body`] stream ([`Body::Streaming`]). Middlewares that need to
//! inspect a body (the cache write path, for instance) collect it and put a
//! fresh [`Body::Full`] back so the caller still sees the whole payload.
//!
//! Request bodies cannot be replayed once they are sent. A request that may be
//! re-issued carries a [`BodyFactory`] in its extensions; the retry middleware
//! uses it to re-create the body for every attempt.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use futures::{Stream, TryStreamExt};
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyDataStream, BodyExt, StreamBody};
use pin_project::pin_project;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

/// Type-erased error used for body and transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// HTTP body used by every request and response in the pipeline.
#[pin_project(project = BodyProj)]
pub enum Body {
    /// Fully buffered payload.
    ///
    /// The `Option` lets the data be yielded once and then report end of stream.
    Full(Option<Bytes>),
    /// Payload streamed from the network or another producer.
    Streaming(#[pin] BoxBody<Bytes, BoxError>),
}

impl Body {
    /// An empty body.
    pub fn empty() -> Self {
        Body::Full(None)
    }

    /// A buffered body.
    pub fn full(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        if data.is_empty() {
            Body::Full(None)
        } else {
            Body::Full(Some(data))
        }
    }

    /// Wraps any [`http_body::Body`] as a streaming body.
    pub fn wrap<B>(body: B) -> Self
    where
        B: HttpBody + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        Body::Streaming(
            body.map_frame(|frame| frame.map_data(|mut data| data.copy_to_bytes(data.remaining())))
                .map_err(Into::into)
                .boxed(),
        )
    }

    /// Builds a streaming body out of a stream of chunks.
    pub fn from_stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        Self::wrap(StreamBody::new(stream.map_ok(Frame::data)))
    }

    /// Returns the buffered bytes when the body is [`Body::Full`].
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Body::Full(Some(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Whether the body is known to carry no data.
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Full(None) => true,
            Body::Full(Some(bytes)) => bytes.is_empty(),
            Body::Streaming(body) => body.is_end_stream(),
        }
    }

    /// Reads the whole body into memory.
    pub async fn collect_bytes(self) -> Result<Bytes, BoxError> {
        match self {
            Body::Full(Some(bytes)) => Ok(bytes),
            Body::Full(None) => Ok(Bytes::new()),
            Body::Streaming(body) => Ok(body.collect().await?.to_bytes()),
        }
    }

    /// Turns the body into an [`AsyncRead`] for incremental decoding.
    pub fn into_reader(self) -> impl AsyncRead + Send + Unpin + 'static {
        let stream = BodyDataStream::new(self).map_err(io::Error::other);
        StreamReader::new(stream)
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::empty()
    }
}

impl From<Bytes> for Body {
    fn from(data: Bytes) -> Self {
        Body::full(data)
    }
}

impl From<Vec<u8>> for Body {
    fn from(data: Vec<u8>) -> Self {
        Body::full(data)
    }
}

impl From<String> for Body {
    fn from(data: String) -> Self {
        Body::full(data)
    }
}

impl From<&'static str> for Body {
    fn from(data: &'static str) -> Self {
        Body::full(Bytes::from_static(data.as_bytes()))
    }
}

impl HttpBody for Body {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            BodyProj::Full(data) => Poll::Ready(data.take().map(|bytes| Ok(Frame::data(bytes)))),
            BodyProj::Streaming(body) => body.poll_frame(cx),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            Body::Full(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            Body::Full(None) => SizeHint::with_exact(0),
            Body::Streaming(body) => body.size_hint(),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Body::Full(None) => true,
            Body::Full(Some(_)) => false,
            Body::Streaming(body) => body.is_end_stream(),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Full(Some(bytes)) => f
                .debug_tuple("Full")
                .field(&format!("{} bytes", bytes.len()))
                .finish(),
            Body::Full(None) => f.debug_tuple("Full").field(&"empty").finish(),
            Body::Streaming(_) => f.debug_tuple("Streaming").field(&"...").finish(),
        }
    }
}

/// Re-creates a request body for every send attempt.
///
/// Stored in the request extensions by the request builder. A request whose
/// body was set without a factory cannot be re-issued.
#[derive(Clone)]
pub struct BodyFactory(Arc<dyn Fn() -> Result<Body, BoxError> + Send + Sync>);

impl BodyFactory {
    /// Creates a factory from a closure.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Body, BoxError> + Send + Sync + 'static,
    {
        BodyFactory(Arc::new(factory))
    }

    /// A factory that hands out the same buffered bytes every time.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        BodyFactory::new(move || Ok(Body::full(data.clone())))
    }

    /// Produces a fresh body.
    pub fn make(&self) -> Result<Body, BoxError> {
        (self.0)()
    }
}

impl fmt::Debug for BodyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BodyFactory").field(&"...").finish()
    }
}
