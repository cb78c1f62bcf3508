//! HTTP request and request builder.

use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;

use crate::body::Body;
use crate::cancel::CancelToken;
use crate::client::HttpClient;
use crate::error::{Result, TransportError};
use crate::response::Response;

/// An HTTP request ready to be handed to a [`Transport`](crate::Transport).
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: url::Url,
    headers: HeaderMap,
    body: Option<Body>,
    cancel: CancelToken,
}

impl Request {
    /// Create a request with no headers, no body and a fresh cancel token.
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            cancel: CancelToken::new(),
        }
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace the cancel token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get the method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the URL.
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Get the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the headers mutably.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get the body, if any.
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: Option<Body>) {
        self.body = body;
    }

    /// Take the body out of the request.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    /// Get the cancel token governing this request.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Copy everything except the body.
    ///
    /// The copy shares the cancel token with the original.
    pub fn clone_head(&self) -> Self {
        Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: None,
            cancel: self.cancel.clone(),
        }
    }
}

/// HTTP request builder bound to an [`HttpClient`].
///
/// Invalid input (a bad header, a body that fails to serialize) is remembered
/// and reported by [`build`](Self::build) or [`send`](Self::send).
pub struct RequestBuilder<'a> {
    client: &'a HttpClient,
    method: Method,
    url: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Body>,
    timeout: Option<Duration>,
    cancel: Option<CancelToken>,
    error: Option<TransportError>,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(client: &'a HttpClient, method: Method, url: String) -> Self {
        Self {
            client,
            method,
            url,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
            cancel: None,
            error: None,
        }
    }

    fn fail(mut self, error: TransportError) -> Self {
        self.error.get_or_insert(error);
        self
    }

    /// Add a header to the request.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = match HeaderName::try_from(name.as_ref()) {
            Ok(name) => name,
            Err(e) => return self.fail(TransportError::RequestBuild(e.to_string())),
        };
        let value = match HeaderValue::try_from(value.as_ref()) {
            Ok(value) => value,
            Err(e) => return self.fail(TransportError::RequestBuild(e.to_string())),
        };
        self.headers.insert(name, value);
        self
    }

    /// Add multiple headers to the request.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add multiple query parameters.
    pub fn queries<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in params {
            self.query.push((k.into(), v.into()));
        }
        self
    }

    /// Set the request body.
    ///
    /// Streaming bodies should carry a factory (see [`Body::with_factory`]) so
    /// that retries can resend them in full.
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the request body as text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.body = Some(Body::from(text.into()));
        self
    }

    /// Set the request body as JSON.
    pub fn json<T: Serialize + ?Sized>(mut self, json: &T) -> Self {
        match serde_json::to_vec(json) {
            Ok(bytes) => {
                self.headers.insert(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                self.body = Some(Body::from(Bytes::from(bytes)));
                self
            }
            Err(e) => self.fail(TransportError::Json(e.to_string())),
        }
    }

    /// Set the request body as form data.
    pub fn form<T: Serialize + ?Sized>(mut self, form: &T) -> Self {
        match serde_urlencoded::to_string(form) {
            Ok(encoded) => {
                self.headers.insert(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                );
                self.body = Some(Body::from(encoded));
                self
            }
            Err(e) => self.fail(TransportError::RequestBuild(e.to_string())),
        }
    }

    /// Override the client's overall timeout for this request.
    ///
    /// The timeout covers every attempt and every backoff wait.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Govern the request with a caller-owned cancel token.
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Set bearer authentication.
    pub fn bearer_auth(self, token: impl AsRef<str>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.as_ref()))
    }

    /// Set basic authentication.
    pub fn basic_auth(self, username: impl AsRef<str>, password: Option<impl AsRef<str>>) -> Self {
        use base64::Engine;
        let credentials = match password {
            Some(p) => format!("{}:{}", username.as_ref(), p.as_ref()),
            None => format!("{}:", username.as_ref()),
        };
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        self.header("Authorization", format!("Basic {}", encoded))
    }

    fn build_url(&self) -> Result<url::Url> {
        let mut url = match &self.client.config().base_url {
            Some(base) => {
                let base = url::Url::parse(base)
                    .map_err(|e| TransportError::InvalidUrl(format!("{base}: {e}")))?;
                base.join(&self.url)
                    .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", self.url)))?
            }
            None => url::Url::parse(&self.url)
                .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", self.url)))?,
        };

        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Build the request without sending it.
    pub fn build(self) -> Result<Request> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let url = self.build_url()?;
        let config = self.client.config();

        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| TransportError::RequestBuild(e.to_string()))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| TransportError::RequestBuild(e.to_string()))?;
            headers.insert(name, value);
        }
        headers.extend(self.headers);

        let cancel = self.cancel.unwrap_or_default();
        let cancel = match self.timeout.or(config.timeout) {
            Some(timeout) => cancel.child_with_timeout(timeout),
            None => cancel,
        };

        Ok(Request {
            method: self.method,
            url,
            headers,
            body: self.body,
            cancel,
        })
    }

    /// Build and send the request.
    pub async fn send(self) -> Result<Response> {
        let client = self.client;
        let request = self.build()?;
        client.execute(request).await
    }
}
