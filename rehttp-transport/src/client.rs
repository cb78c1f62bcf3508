//! HTTP client implementation.

use std::sync::Arc;

use http::Method;

use crate::backoff::ExponentialJitter;
use crate::config::HttpClientConfig;
use crate::error::Result;
use crate::request::{Request, RequestBuilder};
use crate::response::Response;
use crate::retry::DefaultRetryDecision;
use crate::retrying::RetryingTransport;
use crate::transport::{ReqwestTransport, Transport};

/// HTTP client whose requests go through a [`RetryingTransport`].
///
/// With [`HttpClientConfig::retry`] unset, requests go straight to the inner
/// transport.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    config: Arc<HttpClientConfig>,
}

impl HttpClient {
    /// Create a client that sends over reqwest.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let inner = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, inner))
    }

    /// Create a client with default configuration.
    pub fn default_client() -> Result<Self> {
        Self::new(HttpClientConfig::default())
    }

    /// Create a client over a custom inner transport.
    ///
    /// Retries are layered on top of `inner` according to `config.retry`.
    pub fn with_transport(config: HttpClientConfig, inner: impl Transport + 'static) -> Self {
        let transport: Arc<dyn Transport> = match &config.retry {
            Some(retry) => Arc::new(RetryingTransport::new(
                inner,
                retry.max_additional_attempts,
                DefaultRetryDecision,
                ExponentialJitter::new(retry.backoff_base, retry.backoff_cap),
            )),
            None => Arc::new(inner),
        };

        Self {
            transport,
            config: Arc::new(config),
        }
    }

    /// Get the client configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Get the transport requests are sent through.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Create a GET request builder.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::GET, url.into())
    }

    /// Create a POST request builder.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::POST, url.into())
    }

    /// Create a PUT request builder.
    pub fn put(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::PUT, url.into())
    }

    /// Create a PATCH request builder.
    pub fn patch(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::PATCH, url.into())
    }

    /// Create a DELETE request builder.
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::DELETE, url.into())
    }

    /// Create a HEAD request builder.
    pub fn head(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::HEAD, url.into())
    }

    /// Create a request builder with a custom method.
    pub fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, method, url.into())
    }

    /// Send a prepared request.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        self.transport.execute(request).await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
