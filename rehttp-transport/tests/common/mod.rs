//! Scripted inner transport and recording strategies for retry tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use http::{HeaderMap, Method, StatusCode};
use parking_lot::Mutex;
use rehttp_transport::{
    Backoff, BoxError, CancelCause, Outcome, Request, Response, ResponseBody, Result,
    RetryDecision, Transport, TransportError,
};

/// What the scripted transport answers for one send.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A response with this status and a short two-chunk body.
    Status(u16),
    /// A response whose body fails halfway through.
    BrokenBody(u16),
    /// A connection error with this message.
    Error(&'static str),
    /// The inner transport observed cancellation.
    Cancelled,
}

/// Observes how a response body was consumed.
#[derive(Debug, Clone, Default)]
pub struct BodyProbe {
    bytes_read: Arc<AtomicUsize>,
    finished: Arc<AtomicBool>,
    closes: Arc<AtomicUsize>,
}

impl BodyProbe {
    pub fn bytes_read(&self) -> usize {
        self.bytes_read.load(Ordering::SeqCst)
    }

    /// The stream was read until it reported its end.
    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Read to the end, then released exactly once.
    pub fn drained(&self) -> bool {
        self.finished() && self.closes() == 1
    }

    /// Nothing was read from the body.
    pub fn untouched(&self) -> bool {
        self.bytes_read() == 0 && !self.finished()
    }
}

struct ProbeStream {
    chunks: VecDeque<std::result::Result<Bytes, BoxError>>,
    probe: BodyProbe,
}

impl Stream for ProbeStream {
    type Item = std::result::Result<Bytes, BoxError>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.chunks.pop_front() {
            Some(chunk) => {
                if let Ok(bytes) = &chunk {
                    this.probe.bytes_read.fetch_add(bytes.len(), Ordering::SeqCst);
                }
                Poll::Ready(Some(chunk))
            }
            None => {
                this.probe.finished.store(true, Ordering::SeqCst);
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for ProbeStream {
    fn drop(&mut self) {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// A request as the inner transport saw it.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub method: Method,
    pub url: url::Url,
    pub headers: HeaderMap,
    /// `None` when the request carried no body at all.
    pub body: Option<Bytes>,
}

/// Inner transport that answers from a fixed script.
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    sent: Mutex<Vec<SentRequest>>,
    probes: Mutex<Vec<BodyProbe>>,
    read_from: usize,
}

impl ScriptedTransport {
    /// Answer with `replies` in order; request bodies are read in full.
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            sent: Mutex::new(Vec::new()),
            probes: Mutex::new(Vec::new()),
            read_from: 0,
        })
    }

    /// Like [`new`](Self::new), but the bodies of the first `first_read`
    /// sends are dropped unread and recorded as empty.
    pub fn reading_bodies_from(first_read: usize, replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            sent: Mutex::new(Vec::new()),
            probes: Mutex::new(Vec::new()),
            read_from: first_read,
        })
    }

    pub fn sends(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().clone()
    }

    /// Probes for the response bodies handed out, in send order.
    pub fn probes(&self) -> Vec<BodyProbe> {
        self.probes.lock().clone()
    }

    fn respond(&self, status: u16, chunks: Vec<std::result::Result<Bytes, BoxError>>) -> Response {
        let probe = BodyProbe::default();
        self.probes.lock().push(probe.clone());
        let body = ResponseBody::wrap_stream(ProbeStream {
            chunks: chunks.into(),
            probe,
        });
        Response::new(StatusCode::from_u16(status).unwrap(), body)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, mut request: Request) -> Result<Response> {
        let index = self.sent.lock().len();
        let body = match request.take_body() {
            Some(body) if index >= self.read_from => {
                Some(body.collect().await.map_err(TransportError::Body)?)
            }
            Some(_) => Some(Bytes::new()),
            None => None,
        };
        self.sent.lock().push(SentRequest {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
            body,
        });

        let reply = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or(Reply::Error("script exhausted"));

        match reply {
            Reply::Status(status) => Ok(self.respond(
                status,
                vec![Ok(Bytes::from_static(b"status ")), Ok(Bytes::from(status.to_string()))],
            )),
            Reply::BrokenBody(status) => Ok(self.respond(
                status,
                vec![Ok(Bytes::from_static(b"partial")), Err("connection reset".into())],
            )),
            Reply::Error(message) => Err(TransportError::Connection(message.to_string())),
            Reply::Cancelled => Err(TransportError::Cancelled(CancelCause::Cancelled)),
        }
    }
}

/// What a decision was shown for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    Status(u16),
    Error(String),
}

/// Wraps a decision and records every outcome it is shown.
#[derive(Clone)]
pub struct RecordingDecision<D> {
    inner: D,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl<D: RetryDecision> RecordingDecision<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            seen: Arc::default(),
        }
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }
}

impl<D: RetryDecision> RetryDecision for RecordingDecision<D> {
    fn should_retry(&self, outcome: Outcome<'_>) -> bool {
        let seen = match outcome {
            Ok(response) => Seen::Status(response.status().as_u16()),
            Err(error) => Seen::Error(error.to_string()),
        };
        self.seen.lock().push(seen);
        self.inner.should_retry(outcome)
    }
}

/// Retries everything.
#[derive(Debug, Clone, Copy)]
pub struct AlwaysRetry;

impl RetryDecision for AlwaysRetry {
    fn should_retry(&self, _outcome: Outcome<'_>) -> bool {
        true
    }
}

/// Constant wait that records the attempts it was asked about.
#[derive(Clone)]
pub struct RecordingBackoff {
    wait: Duration,
    calls: Arc<Mutex<Vec<u32>>>,
}

impl RecordingBackoff {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().clone()
    }
}

impl Backoff for RecordingBackoff {
    fn backoff(&self, attempt: u32) -> Duration {
        self.calls.lock().push(attempt);
        self.wait
    }
}

/// Assert that paused time advanced by `expected`, give or take a timer tick.
pub fn assert_elapsed(started: tokio::time::Instant, expected: Duration) {
    let elapsed = started.elapsed();
    assert!(
        elapsed >= expected && elapsed <= expected + Duration::from_millis(5),
        "expected ~{expected:?}, got {elapsed:?}"
    );
}

pub fn url() -> url::Url {
    url::Url::parse("http://scripted.test/post").unwrap()
}
