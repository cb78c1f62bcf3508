//! Request-scoped cancellation.
//!
//! A [`CancelToken`] travels with every [`Request`](crate::Request) and governs
//! the whole call: inner sends race against it and retry backoff waits are cut
//! short by it. A client-level timeout is expressed as a deadline on the same
//! token rather than as a separate mechanism.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a [`CancelToken`] fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    /// [`CancelToken::cancel`] was called on the token or one of its parents.
    Cancelled,
    /// The token's deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelCause::Cancelled => f.write_str("request cancelled"),
            CancelCause::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// Cancellation signal carried by a request.
///
/// Cloning shares the signal. [`child_with_timeout`](Self::child_with_timeout)
/// derives a token that fires when its parent does or when its own deadline
/// passes, whichever comes first.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Create a token that only fires on an explicit [`cancel`](Self::cancel).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token that fires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Create a token that fires after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Derive a child token that additionally fires after `timeout`.
    ///
    /// The child keeps the parent's deadline if that one is earlier.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing <= candidate => existing,
            _ => candidate,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Fire the token.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The deadline attached to this token, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Check if the token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cause().is_some()
    }

    /// Report why the token fired, or `None` if it has not.
    ///
    /// An explicit cancellation takes precedence over a passed deadline.
    pub fn cause(&self) -> Option<CancelCause> {
        if self.token.is_cancelled() {
            return Some(CancelCause::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelCause::DeadlineExceeded),
            _ => None,
        }
    }

    /// Wait until the token fires.
    pub async fn cancelled(&self) -> CancelCause {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => CancelCause::Cancelled,
                _ = tokio::time::sleep_until(deadline) => CancelCause::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                CancelCause::Cancelled
            }
        }
    }
}
