//! # rehttp transport
//!
//! A retrying HTTP transport. [`RetryingTransport`] wraps any [`Transport`]
//! and re-sends requests that fail transiently, within a bounded retry budget
//! and a caller-supplied backoff schedule.
//!
//! ## Features
//!
//! - **Pluggable strategies**: retry decisions and backoff schedules are plain
//!   values, closures included
//! - **Body rewinding**: request bodies are replayed through their factory,
//!   or buffered from what is left of a one-shot stream
//! - **Connection reuse**: discarded responses are drained before the next try
//! - **Cancellation**: a per-request token, optionally with a deadline,
//!   preempts both in-flight sends and backoff waits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rehttp_transport::{HttpClient, HttpClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::new(HttpClientConfig::default())?;
//!
//!     let response = client
//!         .post("https://httpbin.org/post")
//!         .json(&serde_json::json!({"name": "Nori"}))
//!         .send()
//!         .await?;
//!
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! ## Composing a transport by hand
//!
//! ```rust,no_run
//! use rehttp_transport::{
//!     DefaultRetryDecision, ExponentialJitter, Request, ReqwestTransport, RetryingTransport,
//!     Transport,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = RetryingTransport::new(
//!     ReqwestTransport::shared()?,
//!     3,
//!     DefaultRetryDecision,
//!     ExponentialJitter::from_millis(1000, 10_000),
//! );
//!
//! let request = Request::new(http::Method::GET, "https://example.com".parse()?);
//! let response = transport.execute(request).await?;
//! println!("{}", response.text().await?);
//! # Ok(())
//! # }
//! ```

mod backoff;
mod body;
mod cancel;
mod client;
mod config;
mod error;
mod request;
mod response;
mod retry;
mod retrying;
mod rewind;
mod transport;

pub use backoff::{Backoff, BackoffStrategy, ExponentialJitter};
pub use body::{Body, BodyFactory, BodyStream};
pub use cancel::{CancelCause, CancelToken};
pub use client::HttpClient;
pub use config::{HttpClientConfig, HttpClientConfigBuilder};
pub use error::{BoxError, Result, TransportError};
pub use request::{Request, RequestBuilder};
pub use response::{Response, ResponseBody};
pub use retry::{
    DefaultRetryDecision, Outcome, RetryDecision, RetrySettings, StatusRetryDecision, retry_if,
};
pub use retrying::{RetryingTransport, RetryingTransportBuilder};
pub use rewind::RewindableBody;
pub use transport::{ReqwestTransport, Transport};

pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        Backoff, Body, CancelToken, DefaultRetryDecision, ExponentialJitter, HttpClient,
        HttpClientConfig, Request, Response, RetryDecision, RetryingTransport, Transport,
        TransportError,
    };
}
