//! Retry decisions and retry settings.

use std::time::Duration;

use crate::backoff::ExponentialJitter;
use crate::error::TransportError;
use crate::response::Response;

/// The outcome of one attempt, as seen by a [`RetryDecision`].
pub type Outcome<'a> = Result<&'a Response, &'a TransportError>;

/// Decides whether a completed attempt warrants another try.
///
/// Only a shared reference to the response is given, so a decision can
/// inspect the status and headers but never consume the body.
pub trait RetryDecision: Send + Sync {
    /// Return `true` to retry.
    fn should_retry(&self, outcome: Outcome<'_>) -> bool;
}

impl<F> RetryDecision for F
where
    F: for<'a> Fn(Outcome<'a>) -> bool + Send + Sync,
{
    fn should_retry(&self, outcome: Outcome<'_>) -> bool {
        self(outcome)
    }
}

/// Build a [`RetryDecision`] from a closure.
///
/// Pins down the closure's signature so it can be passed straight to
/// [`RetryingTransport::new`](crate::RetryingTransport::new).
pub fn retry_if<F>(f: F) -> F
where
    F: for<'a> Fn(Outcome<'a>) -> bool + Send + Sync,
{
    f
}

/// Retry on any error except cancellation, and on any status of 500 or above.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRetryDecision;

impl RetryDecision for DefaultRetryDecision {
    fn should_retry(&self, outcome: Outcome<'_>) -> bool {
        match outcome {
            Ok(response) => response.status().as_u16() >= 500,
            Err(error) => !error.is_cancelled(),
        }
    }
}

/// Retry on an explicit set of status codes, with per-kind error toggles.
#[derive(Debug, Clone)]
pub struct StatusRetryDecision {
    /// Status codes that should trigger a retry.
    pub retry_status_codes: Vec<u16>,
    /// Whether to retry on connection errors.
    pub retry_on_connection_error: bool,
    /// Whether to retry on timeout errors reported by the inner transport.
    pub retry_on_timeout: bool,
}

impl Default for StatusRetryDecision {
    fn default() -> Self {
        Self {
            retry_status_codes: vec![408, 429, 500, 502, 503, 504],
            retry_on_connection_error: true,
            retry_on_timeout: true,
        }
    }
}

impl StatusRetryDecision {
    /// Replace the status codes to retry on.
    pub fn with_status_codes(mut self, codes: Vec<u16>) -> Self {
        self.retry_status_codes = codes;
        self
    }

    /// Disable retry on connection errors.
    pub fn no_retry_on_connection(mut self) -> Self {
        self.retry_on_connection_error = false;
        self
    }

    /// Disable retry on timeout errors.
    pub fn no_retry_on_timeout(mut self) -> Self {
        self.retry_on_timeout = false;
        self
    }

    /// Check if a status code should trigger a retry.
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_status_codes.contains(&status)
    }
}

impl RetryDecision for StatusRetryDecision {
    fn should_retry(&self, outcome: Outcome<'_>) -> bool {
        let error = match outcome {
            Ok(response) => return self.should_retry_status(response.status().as_u16()),
            Err(error) => error,
        };

        // The request's own deadline is not a transient failure.
        if error.is_cancelled() {
            return false;
        }
        if error.is_timeout() {
            return self.retry_on_timeout;
        }
        if error.is_connection() {
            return self.retry_on_connection_error;
        }

        match error {
            TransportError::Io(_) => self.retry_on_connection_error,
            _ => error
                .status_code()
                .is_some_and(|status| self.should_retry_status(status)),
        }
    }
}

/// Retry settings used by [`HttpClient`](crate::HttpClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    /// Attempts allowed after the first one.
    pub max_additional_attempts: u32,
    /// Base delay for exponential backoff.
    pub backoff_base: Duration,
    /// Cap on the backoff ceiling.
    pub backoff_cap: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_additional_attempts: 3,
            backoff_base: Duration::from_millis(1000),
            backoff_cap: Duration::from_millis(10_000),
        }
    }
}

impl RetrySettings {
    /// Create settings with exponential full-jitter backoff.
    pub fn exponential(max_additional_attempts: u32, base: Duration, cap: Duration) -> Self {
        Self {
            max_additional_attempts,
            backoff_base: base,
            backoff_cap: cap,
        }
    }

    /// The backoff schedule these settings describe.
    pub fn backoff(&self) -> ExponentialJitter {
        ExponentialJitter::new(self.backoff_base, self.backoff_cap)
    }
}
