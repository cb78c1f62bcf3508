//! HTTP response wrapper.
//!
//! The body is a one-shot stream. Reading helpers consume the response, so a
//! response handed to the caller has never been read by the transport.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt, stream};
use http::{HeaderMap, HeaderValue, StatusCode, header::HeaderName};
use serde::de::DeserializeOwned;

use crate::error::{BoxError, Result, TransportError};

type ResponseStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, BoxError>> + Send>>;

/// One-shot response body stream.
pub struct ResponseBody {
    inner: ResponseStream,
}

impl ResponseBody {
    /// An empty body.
    pub fn empty() -> Self {
        Self::wrap_stream(stream::empty())
    }

    /// Wrap a stream of chunks.
    pub fn wrap_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = std::result::Result<Bytes, BoxError>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Read the whole body into memory.
    pub async fn collect(mut self) -> std::result::Result<Bytes, BoxError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.inner.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Read the body to completion, discarding it, and release it.
    ///
    /// Returns the number of bytes discarded.
    pub async fn drain(mut self) -> std::result::Result<u64, BoxError> {
        let mut discarded = 0u64;
        while let Some(chunk) = self.inner.try_next().await? {
            discarded += chunk.len() as u64;
        }
        Ok(discarded)
    }
}

impl Stream for ResponseBody {
    type Item = std::result::Result<Bytes, BoxError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResponseBody { .. }")
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        Self::wrap_stream(stream::once(async move { Ok::<_, BoxError>(bytes) }))
    }
}

impl From<&'static str> for ResponseBody {
    fn from(text: &'static str) -> Self {
        Bytes::from_static(text.as_bytes()).into()
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        Bytes::from(text).into()
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

/// HTTP response.
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    url: Option<url::Url>,
    body: ResponseBody,
}

impl Response {
    /// Create a response with the given status and body.
    pub fn new(status: StatusCode, body: impl Into<ResponseBody>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            url: None,
            body: body.into(),
        }
    }

    /// Wrap a reqwest response without reading its body.
    pub(crate) fn from_reqwest(response: reqwest::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = ResponseBody::wrap_stream(
            response
                .bytes_stream()
                .map_err(|e| Box::new(e) as BoxError),
        );

        Self {
            status,
            headers,
            url: Some(url),
            body,
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the final URL of the response.
    pub fn with_url(mut self, url: url::Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Check if the response was successful (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if the response was a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// Check if the response was a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// Get the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the response URL, if known.
    pub fn url(&self) -> Option<&url::Url> {
        self.url.as_ref()
    }

    /// Get the content length if available.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }

    /// Get the content type if available.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Take the body stream.
    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    /// Read the body as bytes.
    pub async fn bytes(self) -> Result<Bytes> {
        self.body.collect().await.map_err(TransportError::Body)
    }

    /// Read the body as UTF-8 text.
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| TransportError::Body(Box::new(e)))
    }

    /// Read the body and parse it as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Json(e.to_string()))
    }

    /// Read the body to completion and release it.
    ///
    /// Returns the number of bytes discarded.
    pub async fn drain(self) -> Result<u64> {
        self.body.drain().await.map_err(TransportError::Drain)
    }

    /// Turn a 4xx or 5xx response into an error carrying the body text.
    pub async fn error_for_status(self) -> Result<Self> {
        if self.status.is_client_error() || self.status.is_server_error() {
            let status = self.status.as_u16();
            let message = match self.body.collect().await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(_) => "Unknown error".to_string(),
            };
            Err(TransportError::Response { status, message })
        } else {
            Ok(self)
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("url", &self.url.as_ref().map(|u| u.as_str()))
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
