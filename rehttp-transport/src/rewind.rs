//! Read/close tracking for request bodies.
//!
//! [`RewindableBody`] sits between a caller's [`Body`] and the bodies handed to
//! each attempt. It records whether any chunk was pulled from the source and
//! whether a handed-out body was dropped, which is all the retry loop needs to
//! decide between reusing the body and producing a fresh one.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use parking_lot::Mutex;
use tracing::warn;

use crate::body::{Body, BodyFactory, BodyStream, collect_stream};
use crate::error::{BoxError, TransportError};

struct BodyState {
    did_read: AtomicBool,
    did_close: AtomicBool,
    source: Mutex<Option<BodyStream>>,
}

/// A request body wrapper with sticky `did_read` / `did_close` flags.
///
/// Wrapping never buffers. Bodies handed out by [`body`](Self::body) all pull
/// from the same source; dropping one marks the wrapper closed but leaves the
/// unread remainder of the source in place so a rewind can still pick it up.
pub struct RewindableBody {
    state: Arc<BodyState>,
    factory: Option<BodyFactory>,
    content_length: Option<u64>,
}

impl RewindableBody {
    /// Wrap a body.
    pub fn new(body: Body) -> Self {
        let factory = body.factory().cloned();
        let content_length = body.content_length();
        Self {
            state: Arc::new(BodyState {
                did_read: AtomicBool::new(false),
                did_close: AtomicBool::new(false),
                source: Mutex::new(Some(body.into_stream())),
            }),
            factory,
            content_length,
        }
    }

    /// Hand out a body that reads through this wrapper.
    pub fn body(&self) -> Body {
        Body::from_tracked(
            Tracked {
                state: Arc::clone(&self.state),
            },
            self.factory.clone(),
            self.content_length,
        )
    }

    /// Check if any chunk has been read from the source.
    pub fn did_read(&self) -> bool {
        self.state.did_read.load(Ordering::Acquire)
    }

    /// Check if a handed-out body has been dropped.
    pub fn did_close(&self) -> bool {
        self.state.did_close.load(Ordering::Acquire)
    }

    /// Check if the body can be sent again as-is.
    pub fn is_untouched(&self) -> bool {
        !self.did_read() && !self.did_close()
    }

    /// Check if a body factory is available for rewinding.
    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }

    /// Produce a wrapper that is ready to be sent again.
    ///
    /// An untouched body is returned unchanged. Otherwise the factory is asked
    /// for a fresh body; without one, whatever the source still holds is
    /// buffered and replayed from memory, and that buffer becomes the factory
    /// for later rewinds.
    pub async fn rewind(self) -> Result<Self, TransportError> {
        if self.is_untouched() {
            return Ok(self);
        }

        if let Some(factory) = &self.factory {
            let fresh = factory().map_err(TransportError::Rewind)?;
            return Ok(Self::new(fresh.or_factory(Arc::clone(factory))));
        }

        if self.did_read() {
            warn!("Replaying partially read request body without a factory; only the unread remainder is resent");
        }

        let residual = self.state.source.lock().take();
        let bytes = match residual {
            Some(stream) => collect_stream(stream).await.map_err(TransportError::Rewind)?,
            None => Bytes::new(),
        };
        Ok(Self::new(Body::from(bytes)))
    }
}

impl std::fmt::Debug for RewindableBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewindableBody")
            .field("did_read", &self.did_read())
            .field("did_close", &self.did_close())
            .field("has_factory", &self.has_factory())
            .field("content_length", &self.content_length)
            .finish()
    }
}

struct Tracked {
    state: Arc<BodyState>,
}

impl Stream for Tracked {
    type Item = Result<Bytes, BoxError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut source = self.state.source.lock();
        let Some(stream) = source.as_mut() else {
            return Poll::Ready(None);
        };
        let poll = stream.as_mut().poll_next(cx);
        match &poll {
            Poll::Ready(Some(_)) => self.state.did_read.store(true, Ordering::Release),
            // A finished stream must not be polled again.
            Poll::Ready(None) => *source = None,
            Poll::Pending => {}
        }
        poll
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.state.did_close.store(true, Ordering::Release);
    }
}
