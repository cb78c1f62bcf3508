//! Transport error types.

use thiserror::Error;

use crate::cancel::CancelCause;

/// Boxed error used for body streams and user-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors produced by transports and the request/response helpers.
///
/// Errors raised by an inner transport (`Http`, `Connection`, `Io`) pass
/// through [`RetryingTransport`](crate::RetryingTransport) untouched. Only
/// `Drain`, `Rewind` and `Cancelled` originate in the retry loop itself.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// Underlying reqwest error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection-level failure reported by a custom transport.
    #[error("Connection error: {0}")]
    Connection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A discarded response body could not be read to completion.
    #[error("Failed to drain response body: {0}")]
    Drain(#[source] BoxError),

    /// A fresh request body could not be produced for a retry.
    #[error("Failed to rewind request body: {0}")]
    Rewind(#[source] BoxError),

    /// The request's cancel token fired.
    #[error("Request cancelled: {0}")]
    Cancelled(CancelCause),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Request building error.
    #[error("Failed to build request: {0}")]
    RequestBuild(String),

    /// Response body could not be read by a helper such as [`Response::bytes`](crate::Response::bytes).
    #[error("Failed to read response body: {0}")]
    Body(#[source] BoxError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Response error produced by [`Response::error_for_status`](crate::Response::error_for_status).
    #[error("Response error: {status} - {message}")]
    Response {
        /// HTTP status code.
        status: u16,
        /// Response body, lossily decoded.
        message: String,
    },

    /// Transport was misconfigured.
    #[error("Invalid transport configuration: {0}")]
    Config(String),
}

impl TransportError {
    /// Check if the request was abandoned through its cancel token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Cancelled(CancelCause::DeadlineExceeded))
            || matches!(self, Self::Http(e) if e.is_timeout())
    }

    /// Check if this is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_)) || matches!(self, Self::Http(e) if e.is_connect())
    }

    /// Get the HTTP status code if one is attached to this error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
