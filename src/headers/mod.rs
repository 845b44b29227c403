//! Mandatory header assembly.

use crate::types::Header;
use tracing::trace;

/// Fixed client identifier sent as `User-Agent`.
pub const DEFAULT_USER_AGENT: &str = concat!("aws-http/", env!("CARGO_PKG_VERSION"));

/// Builds the header list for every request.
///
/// The order is fixed: `Accept`, `Host`, `User-Agent`, `Content-Type`, then the
/// caller's headers verbatim, then `Content-Length` when the body is non-empty.
/// Caller headers are never de-duplicated against the fixed set.
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    user_agent: String,
}

impl HeaderBuilder {
    /// Create a builder with the given client identifier.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    /// The client identifier in use.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Build the header list for a request.
    pub fn build(
        &self,
        host: &str,
        body: &[u8],
        content_type: &str,
        additional: &[Header],
    ) -> Vec<Header> {
        let mut headers = Vec::with_capacity(additional.len() + 5);
        headers.push(Header::new("Accept", "application/json"));
        headers.push(Header::new("Host", host));
        headers.push(Header::new("User-Agent", self.user_agent.as_str()));
        headers.push(Header::new("Content-Type", content_type));
        headers.extend(additional.iter().cloned());

        if !body.is_empty() {
            headers.push(Header::new("Content-Length", body.len().to_string()));
        }

        trace!(count = headers.len(), host, "Built request headers");
        headers
    }
}

impl Default for HeaderBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

/// Build the header list with the default client identifier.
pub fn build_headers(
    host: &str,
    body: &[u8],
    content_type: &str,
    additional: &[Header],
) -> Vec<Header> {
    HeaderBuilder::default().build(host, body, content_type, additional)
}
