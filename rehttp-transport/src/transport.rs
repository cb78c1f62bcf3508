//! The transport abstraction and its reqwest-backed implementation.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::config::HttpClientConfig;
use crate::error::{Result, TransportError};
use crate::request::Request;
use crate::response::Response;

/// Executes one HTTP request.
///
/// A transport returns either a response or an error, never both. It must
/// leave the response body unread.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the response head with a streaming body.
    async fn execute(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: Request) -> Result<Response> {
        (**self).execute(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn execute(&self, request: Request) -> Result<Response> {
        (**self).execute(request).await
    }
}

static SHARED: OnceCell<Arc<ReqwestTransport>> = OnceCell::new();

/// Transport backed by a [`reqwest::Client`].
///
/// Sends race against the request's cancel token; a fired token aborts the
/// send and is reported as [`TransportError::Cancelled`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport from client configuration.
    ///
    /// The overall timeout is not applied here; it travels with each request
    /// as a deadline on its cancel token.
    pub fn new(config: &HttpClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent);

        if config.gzip {
            builder = builder.gzip(true);
        }
        if config.brotli {
            builder = builder.brotli(true);
        }
        if config.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        } else {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Config(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// The process-wide default transport, built on first use.
    pub fn shared() -> Result<Arc<Self>> {
        SHARED
            .get_or_try_init(|| Self::new(&HttpClientConfig::default()).map(Arc::new))
            .cloned()
    }

    /// Get the underlying reqwest client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    fn to_reqwest(&self, mut request: Request) -> Result<reqwest::Request> {
        let body = request.take_body();
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());

        if let Some(body) = body {
            if body.is_stream()
                && let Some(len) = body.content_length()
                && !request.headers().contains_key(http::header::CONTENT_LENGTH)
            {
                builder = builder.header(http::header::CONTENT_LENGTH, len);
            }
            if let Some(body) = body.into_reqwest() {
                builder = builder.body(body);
            }
        }

        builder
            .build()
            .map_err(|e| TransportError::RequestBuild(e.to_string()))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        let cancel = request.cancel_token().clone();
        if let Some(cause) = cancel.cause() {
            return Err(TransportError::Cancelled(cause));
        }

        let request = self.to_reqwest(request)?;
        debug!(method = %request.method(), url = %request.url(), "Executing request");

        tokio::select! {
            biased;
            cause = cancel.cancelled() => Err(TransportError::Cancelled(cause)),
            result = self.client.execute(request) => {
                let response = result?;
                Ok(Response::from_reqwest(response))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::cancel::{CancelCause, CancelToken};
    use http::Method;

    fn transport() -> ReqwestTransport {
        ReqwestTransport::new(&HttpClientConfig::default()).unwrap()
    }

    #[test]
    fn test_stream_body_gets_declared_length() {
        let chunks: Vec<std::result::Result<bytes::Bytes, crate::BoxError>> =
            vec![Ok(bytes::Bytes::from_static(b"abcd"))];
        let request = Request::new(Method::PUT, url::Url::parse("http://localhost/upload").unwrap())
            .with_body(Body::wrap_stream(futures::stream::iter(chunks)).with_content_length(4));

        let request = transport().to_reqwest(request).unwrap();
        assert_eq!(request.headers()[http::header::CONTENT_LENGTH], "4");
    }

    #[test]
    fn test_empty_body_sends_nothing() {
        let request = Request::new(Method::POST, url::Url::parse("http://localhost/").unwrap())
            .with_body(Body::empty());

        let request = transport().to_reqwest(request).unwrap();
        assert!(request.body().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let token = CancelToken::new();
        token.cancel();
        let request = Request::new(Method::GET, url::Url::parse("http://localhost:9/").unwrap())
            .with_cancel_token(token);

        let err = transport().execute(request).await.unwrap_err();
        assert!(matches!(err, TransportError::Cancelled(CancelCause::Cancelled)));
    }

    #[test]
    fn test_shared_is_reused() {
        let first = ReqwestTransport::shared().unwrap();
        let second = ReqwestTransport::shared().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
