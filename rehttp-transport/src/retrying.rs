//! The retrying transport.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{Instrument, debug, debug_span, info};

use crate::backoff::Backoff;
use crate::body::Body;
use crate::cancel::{CancelCause, CancelToken};
use crate::error::{Result, TransportError};
use crate::request::Request;
use crate::response::Response;
use crate::retry::RetryDecision;
use crate::rewind::RewindableBody;
use crate::transport::{ReqwestTransport, Transport};

/// Wraps an inner transport and re-sends requests that fail transiently.
///
/// For every call, attempts run strictly one after another:
///
/// 1. the body is rewound if the previous attempt touched it,
/// 2. the inner transport sends a copy of the request,
/// 3. the [`RetryDecision`] judges the outcome; "no retry" returns it as is,
/// 4. once `max_additional_attempts` retries have been spent the last outcome
///    is returned as is,
/// 5. the [`Backoff`] wait runs, cut short if the request's cancel token fires,
/// 6. a discarded response is drained so its connection can be reused.
///
/// The final response's body is never read. Drain, rewind and cancellation
/// failures abort the call; inner transport errors pass through untouched.
///
/// Request bodies are replayed through their factory when one is attached.
/// A streaming body without a factory is buffered from whatever the previous
/// attempt left unread, which is nothing once the stream was sent in full.
#[derive(Clone)]
pub struct RetryingTransport {
    inner: Arc<dyn Transport>,
    max_additional_attempts: u32,
    decision: Arc<dyn RetryDecision>,
    backoff: Arc<dyn Backoff>,
}

impl RetryingTransport {
    /// Create a retrying transport.
    ///
    /// At most `max_additional_attempts + 1` requests are sent per call.
    pub fn new<T, D, B>(inner: T, max_additional_attempts: u32, decision: D, backoff: B) -> Self
    where
        T: Transport + 'static,
        D: RetryDecision + 'static,
        B: Backoff + 'static,
    {
        Self {
            inner: Arc::new(inner),
            max_additional_attempts,
            decision: Arc::new(decision),
            backoff: Arc::new(backoff),
        }
    }

    /// Create a builder.
    pub fn builder() -> RetryingTransportBuilder {
        RetryingTransportBuilder::default()
    }

    /// Attempts allowed after the first one.
    pub fn max_additional_attempts(&self) -> u32 {
        self.max_additional_attempts
    }

    /// The wrapped transport.
    pub fn inner(&self) -> &Arc<dyn Transport> {
        &self.inner
    }

    async fn run(&self, mut request: Request) -> Result<Response> {
        let cancel = request.cancel_token().clone();
        let mut body = AttemptBody::new(request.take_body());
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);
            body = body.rewind().await?;

            let mut sent = request.clone_head();
            sent.set_body(body.for_attempt());

            debug!(attempt, "Sending request");
            let outcome = self.inner.execute(sent).await;
            match &outcome {
                Ok(response) => debug!(attempt, status = response.status().as_u16(), "Attempt completed"),
                Err(error) => debug!(attempt, error = %error, "Attempt failed"),
            }

            if !self.decision.should_retry(outcome.as_ref()) {
                return outcome;
            }
            if attempt > self.max_additional_attempts {
                debug!(attempt, "Retry budget exhausted");
                return outcome;
            }

            let wait = self.backoff.backoff(attempt);
            info!(attempt, wait = ?wait, "Retrying after backoff");
            if let Some(cause) = wait_or_cancel(&cancel, wait).await {
                debug!(attempt, cause = %cause, "Cancelled while backing off");
                return Err(TransportError::Cancelled(cause));
            }

            if let Ok(response) = outcome {
                let discarded = response.drain().await?;
                debug!(attempt, discarded, "Drained discarded response");
            }
        }
    }
}

#[async_trait]
impl Transport for RetryingTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        let span = debug_span!("retrying_transport", method = %request.method(), url = %request.url());
        self.run(request).instrument(span).await
    }
}

impl fmt::Debug for RetryingTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingTransport")
            .field("max_additional_attempts", &self.max_additional_attempts)
            .finish_non_exhaustive()
    }
}

/// Waits out `wait` unless the token fires first. A zero wait only checks
/// the token.
async fn wait_or_cancel(cancel: &CancelToken, wait: Duration) -> Option<CancelCause> {
    if let Some(cause) = cancel.cause() {
        return Some(cause);
    }
    if wait.is_zero() {
        return None;
    }

    tokio::select! {
        biased;
        cause = cancel.cancelled() => Some(cause),
        _ = tokio::time::sleep(wait) => None,
    }
}

enum AttemptBody {
    Absent,
    Empty,
    Tracked(RewindableBody),
}

impl AttemptBody {
    fn new(body: Option<Body>) -> Self {
        match body {
            None => Self::Absent,
            Some(body) if body.is_empty() => Self::Empty,
            Some(body) => Self::Tracked(RewindableBody::new(body)),
        }
    }

    async fn rewind(self) -> Result<Self> {
        match self {
            Self::Tracked(body) => Ok(Self::Tracked(body.rewind().await?)),
            other => Ok(other),
        }
    }

    fn for_attempt(&self) -> Option<Body> {
        match self {
            Self::Absent => None,
            Self::Empty => Some(Body::empty()),
            Self::Tracked(body) => Some(body.body()),
        }
    }
}

/// Builder for [`RetryingTransport`].
#[derive(Default)]
pub struct RetryingTransportBuilder {
    inner: Option<Arc<dyn Transport>>,
    max_additional_attempts: Option<u32>,
    decision: Option<Arc<dyn RetryDecision>>,
    backoff: Option<Arc<dyn Backoff>>,
}

impl RetryingTransportBuilder {
    /// Set the wrapped transport. Defaults to the shared [`ReqwestTransport`].
    pub fn inner(mut self, inner: impl Transport + 'static) -> Self {
        self.inner = Some(Arc::new(inner));
        self
    }

    /// Set the number of attempts allowed after the first one. Defaults to 3.
    pub fn max_additional_attempts(mut self, attempts: u32) -> Self {
        self.max_additional_attempts = Some(attempts);
        self
    }

    /// Set the retry decision. Required.
    pub fn decision(mut self, decision: impl RetryDecision + 'static) -> Self {
        self.decision = Some(Arc::new(decision));
        self
    }

    /// Set the backoff schedule. Required.
    pub fn backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Some(Arc::new(backoff));
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<RetryingTransport> {
        let decision = self
            .decision
            .ok_or_else(|| TransportError::Config("a retry decision is required".to_string()))?;
        let backoff = self
            .backoff
            .ok_or_else(|| TransportError::Config("a backoff schedule is required".to_string()))?;
        let inner: Arc<dyn Transport> = match self.inner {
            Some(inner) => inner,
            None => ReqwestTransport::shared()?,
        };

        Ok(RetryingTransport {
            inner,
            max_additional_attempts: self.max_additional_attempts.unwrap_or(3),
            decision,
            backoff,
        })
    }
}
