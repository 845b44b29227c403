//! Request and result types.
//!
//! A [`Request`] is the caller's logical request. The client never mutates it;
//! header assembly and signing work on a copy. An [`HttpResult`] owns
//! everything it holds, independent of the transport's buffers.

use bytes::Bytes;

/// Default content type of a [`Request`].
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// A single HTTP header.
///
/// Names are not case-normalized; duplicates are preserved in order. Values
/// are text: response header bytes that are not valid UTF-8 are replaced
/// with U+FFFD by the reqwest transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

impl Header {
    /// Create a new header.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive name comparison.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Find the first header with the given name (case-insensitive).
pub fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.is(name))
        .map(|h| h.value.as_str())
}

/// A logical API request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method.
    pub method: String,
    /// Request path, appended verbatim to the endpoint URI.
    pub path: String,
    /// Query string including its leading `?`, or empty.
    pub query: String,
    /// Request body.
    pub body: Bytes,
    /// Value of the `Content-Type` header.
    pub content_type: String,
    /// Additional headers, sent after the fixed set.
    pub headers: Vec<Header>,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: "POST".to_string(),
            path: "/".to_string(),
            query: String::new(),
            body: Bytes::new(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            headers: Vec::new(),
        }
    }
}

impl Request {
    /// Create a request with the given method and default path `/`.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Self::default()
        }
    }

    /// Set the path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the query string. Callers include the leading `?`.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    /// Get a header value by name (case-insensitive, first match).
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// The raw outcome of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResult {
    /// HTTP status code.
    pub response_code: u16,
    /// Response headers in the order the transport reported them.
    pub headers: Vec<Header>,
    /// Response body.
    pub body: Bytes,
}

impl HttpResult {
    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.response_code)
    }

    /// Get a header value by name (case-insensitive, first match).
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// The body as UTF-8, if it is valid UTF-8.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}
