//! Error types for the rehttp CLI.

use std::fmt;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types.
#[derive(Debug)]
pub enum CliError {
    /// IO error writing the response
    Io(std::io::Error),

    /// Settings could not be loaded or are invalid
    Config(String),

    /// Invalid argument
    InvalidArgument(String),

    /// The request failed after all attempts
    Request(rehttp_transport::TransportError),

    /// Ctrl-C arrived before the request finished
    Interrupted,
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgument(_) | CliError::Config(_) => 2,
            CliError::Interrupted => 130,
            CliError::Io(_) | CliError::Request(_) => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "IO error: {}", e),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Request(e) => write!(f, "Request failed: {}", e),
            CliError::Interrupted => write!(f, "Interrupted"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io(e) => Some(e),
            CliError::Request(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<rehttp_config::ConfigError> for CliError {
    fn from(e: rehttp_config::ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<rehttp_transport::TransportError> for CliError {
    fn from(e: rehttp_transport::TransportError) -> Self {
        if e.is_cancelled() && !e.is_timeout() {
            CliError::Interrupted
        } else {
            CliError::Request(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rehttp_transport::{CancelCause, TransportError};

    #[test]
    fn test_cancellation_maps_to_interrupted() {
        let err = CliError::from(TransportError::Cancelled(CancelCause::Cancelled));
        assert!(matches!(err, CliError::Interrupted));
        assert_eq!(err.exit_code(), 130);
    }

    #[test]
    fn test_deadline_stays_a_request_error() {
        let err = CliError::from(TransportError::Cancelled(CancelCause::DeadlineExceeded));
        assert!(matches!(err, CliError::Request(_)));
        assert_eq!(err.exit_code(), 1);
    }
}
