//! HTTP transport layer.
//!
//! The client opens one [`Connection`] per call through an [`HttpTransport`],
//! performs a single exchange on it and drains the body with
//! [`Connection::read`] until it returns 0. Nothing is pooled between calls.

use crate::endpoint::Endpoint;
use crate::error::{AwsHttpError, NetworkError, TlsError};
use crate::tls::TrustAnchor;
use crate::types::Header;
use async_trait::async_trait;
use bytes::{Buf, Bytes};
use std::time::Duration;
use tracing::trace;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for a whole request: connect, send, headers and body.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP request to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: String,
    /// Full request URL.
    pub url: String,
    /// Request headers, sent in order.
    pub headers: Vec<Header>,
    /// Request body. `None` sends no body at all.
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Create a request with no headers and no body.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }
}

/// Status line of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Status code.
    pub code: u16,
    /// Reason phrase, empty if unknown.
    pub reason: String,
}

/// Opens connections to endpoints.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Open a connection to `endpoint`.
    ///
    /// With no trust anchor the server certificate is not verified.
    async fn connect(
        &self,
        endpoint: &Endpoint,
        trust_anchor: Option<&TrustAnchor>,
    ) -> Result<Box<dyn Connection>, AwsHttpError>;
}

/// A single-use connection.
#[async_trait]
pub trait Connection: Send {
    /// Send the request and wait for the status line and headers.
    async fn exchange(&mut self, request: HttpRequest) -> Result<StatusLine, AwsHttpError>;

    /// Headers of the response to the last exchange, in wire order.
    fn response_headers(&self) -> Result<Vec<Header>, AwsHttpError>;

    /// Read body bytes into `buf`. Returns 0 at end of body.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, AwsHttpError>;
}

/// Transport backed by `reqwest`.
///
/// Each connection gets its own client with pooling switched off, so no
/// socket outlives the call that opened it.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport with default timeouts.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a transport builder.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new()
    }

    fn client(&self, trust_anchor: Option<&TrustAnchor>) -> Result<reqwest::Client, TlsError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .pool_max_idle_per_host(0);

        builder = match trust_anchor {
            None => builder.danger_accept_invalid_certs(true),
            Some(TrustAnchor::Bundled) => builder,
            Some(TrustAnchor::Certificates(certs)) => {
                let mut builder = builder.tls_built_in_root_certs(false);
                for der in certs {
                    let cert = reqwest::Certificate::from_der(der).map_err(|e| TlsError::Setup {
                        message: format!("invalid root certificate: {}", e),
                    })?;
                    builder = builder.add_root_certificate(cert);
                }
                builder
            }
        };

        builder.build().map_err(|e| TlsError::Setup {
            message: e.to_string(),
        })
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        trust_anchor: Option<&TrustAnchor>,
    ) -> Result<Box<dyn Connection>, AwsHttpError> {
        trace!(endpoint = %endpoint, "Opening connection");
        let client = self.client(trust_anchor)?;
        Ok(Box::new(ReqwestConnection {
            client,
            request_timeout: self.request_timeout,
            response: None,
            headers: Vec::new(),
            pending: Bytes::new(),
        }))
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct ReqwestTransportBuilder {
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl ReqwestTransportBuilder {
    /// Create a builder with default timeouts.
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the timeout for a whole request, from connect to the last body byte.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build the transport.
    pub fn build(self) -> ReqwestTransport {
        ReqwestTransport {
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
        }
    }
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection opened by [`ReqwestTransport`].
pub struct ReqwestConnection {
    client: reqwest::Client,
    request_timeout: Duration,
    response: Option<reqwest::Response>,
    headers: Vec<Header>,
    pending: Bytes,
}

impl ReqwestConnection {
    fn map_send_error(&self, e: reqwest::Error) -> NetworkError {
        if e.is_timeout() {
            NetworkError::Timeout {
                duration: self.request_timeout,
            }
        } else if e.is_connect() {
            NetworkError::ConnectionFailed {
                message: e.to_string(),
            }
        } else if e.is_builder() {
            NetworkError::InvalidRequest {
                message: e.to_string(),
            }
        } else {
            NetworkError::ExchangeFailed {
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl Connection for ReqwestConnection {
    async fn exchange(&mut self, request: HttpRequest) -> Result<StatusLine, AwsHttpError> {
        let method =
            reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|e| {
                NetworkError::InvalidRequest {
                    message: format!("invalid HTTP method '{}': {}", request.method, e),
                }
            })?;

        let mut builder = self.client.request(method, &request.url);
        for header in &request.headers {
            let name = reqwest::header::HeaderName::from_bytes(header.name.as_bytes())
                .map_err(|e| NetworkError::InvalidRequest {
                    message: format!("invalid header name '{}': {}", header.name, e),
                })?;
            let value = reqwest::header::HeaderValue::from_str(&header.value).map_err(|e| {
                NetworkError::InvalidRequest {
                    message: format!("invalid value for header '{}': {}", header.name, e),
                }
            })?;
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        self.headers = response
            .headers()
            .iter()
            .map(|(name, value)| Header::new(name.as_str(), header_value_text(value)))
            .collect();
        self.pending = Bytes::new();
        self.response = Some(response);

        Ok(StatusLine {
            code: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        })
    }

    fn response_headers(&self) -> Result<Vec<Header>, AwsHttpError> {
        if self.response.is_none() {
            return Err(NetworkError::NoResponse.into());
        }
        Ok(self.headers.clone())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, AwsHttpError> {
        while self.pending.is_empty() {
            let response = self.response.as_mut().ok_or(NetworkError::NoResponse)?;
            match response.chunk().await {
                Ok(Some(chunk)) => self.pending = chunk,
                Ok(None) => return Ok(0),
                Err(e) if e.is_timeout() => {
                    return Err(NetworkError::Timeout {
                        duration: self.request_timeout,
                    }
                    .into())
                }
                Err(e) => {
                    return Err(NetworkError::BodyRead {
                        message: e.to_string(),
                    }
                    .into())
                }
            }
        }

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}

impl std::fmt::Debug for ReqwestConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestConnection")
            .field("request_timeout", &self.request_timeout)
            .field("has_response", &self.response.is_some())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

/// Text of a response header value.
///
/// Bytes that are not valid UTF-8 become U+FFFD.
fn header_value_text(value: &reqwest::header::HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}
