//! Request bodies.
//!
//! A [`Body`] is either the empty sentinel, an in-memory buffer, or a one-shot
//! stream of byte chunks. Bodies may carry a [`BodyFactory`] that produces a
//! fresh copy; retries prefer the factory over buffering whatever is left of a
//! consumed stream. In-memory bodies install a factory automatically.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, stream};

use crate::error::BoxError;

/// One-shot stream of request body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

/// Produces a fresh body for a retried request.
pub type BodyFactory = Arc<dyn Fn() -> Result<Body, BoxError> + Send + Sync>;

enum Kind {
    Empty,
    Bytes(Bytes),
    Stream(BodyStream),
}

/// HTTP request body.
pub struct Body {
    kind: Kind,
    factory: Option<BodyFactory>,
    content_length: Option<u64>,
}

impl Body {
    /// The empty body sentinel. Retries never rewind it.
    pub fn empty() -> Self {
        Self {
            kind: Kind::Empty,
            factory: None,
            content_length: Some(0),
        }
    }

    /// Wrap a one-shot stream of chunks.
    ///
    /// The stream cannot be replayed on its own. Without a factory (see
    /// [`with_factory`](Self::with_factory)) a retry buffers whatever the
    /// previous attempt left unread, which for a consumed stream is nothing.
    pub fn wrap_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, BoxError>> + Send + 'static,
    {
        Self {
            kind: Kind::Stream(Box::pin(stream)),
            factory: None,
            content_length: None,
        }
    }

    /// Attach a factory that produces a fresh copy of this body.
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Result<Body, BoxError> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Declare the body's length, sent as `Content-Length` for streams.
    pub fn with_content_length(mut self, len: u64) -> Self {
        self.content_length = Some(len);
        self
    }

    pub(crate) fn from_tracked<S>(
        stream: S,
        factory: Option<BodyFactory>,
        content_length: Option<u64>,
    ) -> Self
    where
        S: Stream<Item = Result<Bytes, BoxError>> + Send + 'static,
    {
        Self {
            kind: Kind::Stream(Box::pin(stream)),
            factory,
            content_length,
        }
    }

    pub(crate) fn or_factory(mut self, factory: BodyFactory) -> Self {
        if self.factory.is_none() {
            self.factory = Some(factory);
        }
        self
    }

    /// Check if this is the empty sentinel or a zero-length buffer.
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            Kind::Empty => true,
            Kind::Bytes(bytes) => bytes.is_empty(),
            Kind::Stream(_) => false,
        }
    }

    /// Check if this body is a one-shot stream.
    pub fn is_stream(&self) -> bool {
        matches!(self.kind, Kind::Stream(_))
    }

    /// The in-memory contents, if this body is buffered.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match &self.kind {
            Kind::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// The body factory, if one is attached.
    pub fn factory(&self) -> Option<&BodyFactory> {
        self.factory.as_ref()
    }

    /// The declared length, if known.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Convert into a chunk stream, whatever the representation.
    pub fn into_stream(self) -> BodyStream {
        match self.kind {
            Kind::Empty => Box::pin(stream::empty::<Result<Bytes, BoxError>>()),
            Kind::Bytes(bytes) => Box::pin(stream::once(async move { Ok::<_, BoxError>(bytes) })),
            Kind::Stream(s) => s,
        }
    }

    pub(crate) fn into_reqwest(self) -> Option<reqwest::Body> {
        match self.kind {
            Kind::Empty => None,
            Kind::Bytes(bytes) => Some(reqwest::Body::from(bytes)),
            Kind::Stream(s) => Some(reqwest::Body::wrap_stream(s)),
        }
    }

    /// Read the whole body into memory.
    pub async fn collect(self) -> Result<Bytes, BoxError> {
        match self.kind {
            Kind::Empty => Ok(Bytes::new()),
            Kind::Bytes(bytes) => Ok(bytes),
            Kind::Stream(s) => collect_stream(s).await,
        }
    }
}

pub(crate) async fn collect_stream<S>(mut stream: S) -> Result<Bytes, BoxError>
where
    S: Stream<Item = Result<Bytes, BoxError>> + Unpin,
{
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            Kind::Empty => "empty",
            Kind::Bytes(_) => "bytes",
            Kind::Stream(_) => "stream",
        };
        f.debug_struct("Body")
            .field("kind", &kind)
            .field("content_length", &self.content_length)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        let replay = bytes.clone();
        Self {
            content_length: Some(bytes.len() as u64),
            kind: Kind::Bytes(bytes),
            factory: Some(Arc::new(move || Ok(Body::from(replay.clone())))),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Bytes::from(text).into()
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Bytes::from_static(text.as_bytes()).into()
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Bytes::from_static(bytes).into()
    }
}
