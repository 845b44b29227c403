//! Mock HTTP transport for testing.

use crate::endpoint::Endpoint;
use crate::error::{AwsHttpError, NetworkError};
use crate::tls::TrustAnchor;
use crate::transport::{Connection, HttpRequest, HttpTransport, StatusLine};
use crate::types::Header;
use async_trait::async_trait;
use bytes::{Buf, Bytes};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of bytes a mock connection returns per read.
const DEFAULT_READ_CHUNK_SIZE: usize = 4;

/// Mock HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<Header>,
    /// Response body.
    pub body: Bytes,
}

impl MockResponse {
    /// Create a successful response with empty body.
    pub fn ok() -> Self {
        Self::error(200, Bytes::new())
    }

    /// Create a successful response with body.
    pub fn ok_with_body(body: impl Into<Bytes>) -> Self {
        Self::error(200, body)
    }

    /// Create a response with any status.
    pub fn error(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Add a header to the response.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }
}

/// Where an injected failure happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// `connect` fails with `ConnectionFailed`.
    Connect,
    /// `exchange` fails with `ExchangeFailed` after recording the request.
    Exchange,
    /// `read` fails with `BodyRead`.
    Read,
}

impl MockFailure {
    fn error(self) -> AwsHttpError {
        let message = "mock transport failure".to_string();
        match self {
            MockFailure::Connect => NetworkError::ConnectionFailed { message },
            MockFailure::Exchange => NetworkError::ExchangeFailed { message },
            MockFailure::Read => NetworkError::BodyRead { message },
        }
        .into()
    }
}

#[derive(Default)]
struct MockState {
    responses: VecDeque<MockResponse>,
    default_response: Option<MockResponse>,
    echo: bool,
    failure: Option<MockFailure>,
    requests: Vec<HttpRequest>,
    trust_anchors: Vec<Option<TrustAnchor>>,
}

/// Mock HTTP transport for testing.
///
/// Responses come from, in order of precedence: echo mode, the queue, the
/// default response. Every exchanged request is recorded.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    read_chunk_size: usize,
}

impl MockTransport {
    /// Create a mock transport with no responses.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }

    /// Create a mock transport with queued responses.
    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        let transport = Self::new();
        transport.state.lock().responses.extend(responses);
        transport
    }

    /// Create a mock transport that answers every request with `response`.
    pub fn with_default(response: MockResponse) -> Self {
        let transport = Self::new();
        transport.state.lock().default_response = Some(response);
        transport
    }

    /// Create a mock transport that answers 200 with the request's own
    /// headers and body.
    pub fn echo() -> Self {
        let transport = Self::new();
        transport.state.lock().echo = true;
        transport
    }

    /// Create a mock transport that fails at the given step.
    pub fn failing(failure: MockFailure) -> Self {
        let transport = Self::new();
        transport.fail_with(Some(failure));
        transport
    }

    /// Return at most `size` bytes per read.
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: MockResponse) {
        self.state.lock().responses.push_back(response);
    }

    /// Set or clear the injected failure.
    pub fn fail_with(&self, failure: Option<MockFailure>) {
        self.state.lock().failure = failure;
    }

    /// All exchanged requests.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of exchanged requests.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// The last exchanged request.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.state.lock().requests.last().cloned()
    }

    /// Trust anchor passed to each `connect`, in order.
    pub fn trust_anchors(&self) -> Vec<Option<TrustAnchor>> {
        self.state.lock().trust_anchors.clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("read_chunk_size", &self.read_chunk_size)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn connect(
        &self,
        _endpoint: &Endpoint,
        trust_anchor: Option<&TrustAnchor>,
    ) -> Result<Box<dyn Connection>, AwsHttpError> {
        let mut state = self.state.lock();
        state.trust_anchors.push(trust_anchor.cloned());
        if state.failure == Some(MockFailure::Connect) {
            return Err(MockFailure::Connect.error());
        }

        Ok(Box::new(MockConnection {
            state: self.state.clone(),
            read_chunk_size: self.read_chunk_size,
            response: None,
        }))
    }
}

struct MockConnection {
    state: Arc<Mutex<MockState>>,
    read_chunk_size: usize,
    response: Option<MockResponse>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn exchange(&mut self, request: HttpRequest) -> Result<StatusLine, AwsHttpError> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());
        if state.failure == Some(MockFailure::Exchange) {
            return Err(MockFailure::Exchange.error());
        }

        let response = if state.echo {
            MockResponse {
                status: 200,
                headers: request.headers,
                body: request.body.unwrap_or_default(),
            }
        } else {
            state
                .responses
                .pop_front()
                .or_else(|| state.default_response.clone())
                .ok_or_else(|| NetworkError::ExchangeFailed {
                    message: "no mock response queued".to_string(),
                })?
        };

        let status = StatusLine {
            code: response.status,
            reason: String::new(),
        };
        self.response = Some(response);
        Ok(status)
    }

    fn response_headers(&self) -> Result<Vec<Header>, AwsHttpError> {
        self.response
            .as_ref()
            .map(|r| r.headers.clone())
            .ok_or_else(|| NetworkError::NoResponse.into())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, AwsHttpError> {
        if self.state.lock().failure == Some(MockFailure::Read) {
            return Err(MockFailure::Read.error());
        }
        let response = self.response.as_mut().ok_or(NetworkError::NoResponse)?;

        let n = buf
            .len()
            .min(self.read_chunk_size)
            .min(response.body.len());
        buf[..n].copy_from_slice(&response.body[..n]);
        response.body.advance(n);
        Ok(n)
    }
}
