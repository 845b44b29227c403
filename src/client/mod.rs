//! The AWS HTTP client.
//!
//! [`AwsHttp`] ties endpoint resolution, header assembly, signing and the
//! transport together. It holds no per-call state, so one instance can serve
//! concurrent calls from many tasks.

use crate::config::{ClientConfig, Options};
use crate::credentials::{ChainCredentialsProvider, CredentialsProvider};
use crate::endpoint::{Endpoint, EndpointResolver};
use crate::error::{AwsHttpError, ResponseError};
use crate::headers::HeaderBuilder;
use crate::signing::{sign_request, RequestSigner, SigV4Signer, SigningConfig};
use crate::tls::TrustAnchor;
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::types::{find_header, Header, HttpResult, Request};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

/// Size of each body read.
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Upper bound on the body capacity taken from `Content-Length`.
const MAX_BODY_PREALLOCATION: usize = 16 * 1024 * 1024;

/// Low-level AWS HTTP client.
pub struct AwsHttp {
    trust_anchor: Option<TrustAnchor>,
    transport: Arc<dyn HttpTransport>,
    credentials_provider: Arc<dyn CredentialsProvider>,
    signer: Arc<dyn RequestSigner>,
    resolver: EndpointResolver,
    header_builder: HeaderBuilder,
}

impl AwsHttp {
    /// Create a client trusting the certificates in `trust_anchor_pem`.
    ///
    /// With `None` server certificates are **not verified**. Only use that
    /// against local test endpoints. The endpoint override is read from
    /// `AWS_ENDPOINT_URL`.
    pub fn init(trust_anchor_pem: Option<&[u8]>) -> Result<Self, AwsHttpError> {
        let trust_anchor = trust_anchor_pem.map(TrustAnchor::from_pem).transpose()?;
        AwsHttpBuilder::new()
            .from_env()
            .trust_anchor(trust_anchor)
            .build()
    }

    /// Create a client trusting the bundled Mozilla root set.
    pub fn with_bundled_roots() -> Result<Self, AwsHttpError> {
        AwsHttpBuilder::new().from_env().build()
    }

    /// Create a client builder.
    pub fn builder() -> AwsHttpBuilder {
        AwsHttpBuilder::new()
    }

    /// The trust anchor, or `None` if verification is disabled.
    pub fn trust_anchor(&self) -> Option<&TrustAnchor> {
        self.trust_anchor.as_ref()
    }

    /// The endpoint resolver.
    pub fn resolver(&self) -> &EndpointResolver {
        &self.resolver
    }

    /// Resolve, sign and send `request` to `service`.
    ///
    /// The signing region is `options.region` as given, even for
    /// `aws-global`; the signing service is `options.sigv4_service_name` or
    /// `service`.
    pub async fn call_api(
        &self,
        service: &str,
        request: &Request,
        options: &Options,
    ) -> Result<HttpResult, AwsHttpError> {
        let endpoint = self
            .resolver
            .resolve(service, &options.region, options.dualstack)?;

        let credentials = self.credentials_provider.get_credentials().await?;
        debug!(
            provider = self.credentials_provider.name(),
            "Obtained credentials"
        );

        let signing_config = SigningConfig::new(
            options.region.as_str(),
            options.signing_service(service),
            credentials,
        );

        self.make_request(&endpoint, request, Some(&signing_config))
            .await
    }

    /// Send `request` to `endpoint`, signing it when a config is given.
    ///
    /// The caller's request is not modified. The URL is the plain
    /// concatenation of the endpoint URI, path and query.
    pub async fn make_request(
        &self,
        endpoint: &Endpoint,
        request: &Request,
        signing_config: Option<&SigningConfig>,
    ) -> Result<HttpResult, AwsHttpError> {
        let mut prepared = request.clone();
        prepared.headers = self.header_builder.build(
            endpoint.host(),
            &request.body,
            &request.content_type,
            &request.headers,
        );

        let signed = sign_request(self.signer.as_ref(), prepared, signing_config).await?;

        let url = format!("{}{}{}", endpoint.uri(), signed.path, signed.query);
        debug!(
            method = %signed.method,
            url = %url,
            headers = signed.headers.len(),
            body_len = signed.body.len(),
            signed = signed.is_signed(),
            "Sending request"
        );

        let http_request = HttpRequest {
            method: signed.method.clone(),
            url,
            headers: signed.headers.clone(),
            body: (!signed.body.is_empty()).then(|| signed.body.clone()),
        };

        let result = self.send(endpoint, http_request).await;
        drop(signed);
        result
    }

    async fn send(
        &self,
        endpoint: &Endpoint,
        request: HttpRequest,
    ) -> Result<HttpResult, AwsHttpError> {
        let mut connection = self
            .transport
            .connect(endpoint, self.trust_anchor.as_ref())
            .await?;

        let status = connection.exchange(request).await?;
        if !(100..=999).contains(&status.code) {
            return Err(ResponseError::InvalidStatus {
                status: status.code,
            }
            .into());
        }

        let headers = connection.response_headers()?;

        let mut body = Vec::with_capacity(body_capacity_hint(&headers));
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let n = connection.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&buf[..n]);
        }

        debug!(
            status = status.code,
            reason = %status.reason,
            body_len = body.len(),
            "Received response"
        );

        Ok(HttpResult {
            response_code: status.code,
            headers,
            body: Bytes::from(body),
        })
    }
}

/// Initial body capacity from `Content-Length`, or 0.
fn body_capacity_hint(headers: &[Header]) -> usize {
    match find_header(headers, "content-length") {
        None => 0,
        Some(value) => match value.trim().parse::<usize>() {
            Ok(len) => len.min(MAX_BODY_PREALLOCATION),
            Err(e) => {
                warn!(value, error = %e, "Ignoring unparseable Content-Length");
                0
            }
        },
    }
}

impl std::fmt::Debug for AwsHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsHttp")
            .field("trust_anchor", &self.trust_anchor)
            .field("resolver", &self.resolver)
            .field("user_agent", &self.header_builder.user_agent())
            .field("credentials_provider", &self.credentials_provider.name())
            .finish_non_exhaustive()
    }
}

/// Builder for [`AwsHttp`].
pub struct AwsHttpBuilder {
    config: Option<ClientConfig>,
    from_env: bool,
    trust_anchor: Option<TrustAnchor>,
    transport: Option<Arc<dyn HttpTransport>>,
    credentials_provider: Option<Arc<dyn CredentialsProvider>>,
    signer: Option<Arc<dyn RequestSigner>>,
}

impl AwsHttpBuilder {
    /// Create a builder trusting the bundled root set.
    pub fn new() -> Self {
        Self {
            config: None,
            from_env: false,
            trust_anchor: Some(TrustAnchor::Bundled),
            transport: None,
            credentials_provider: None,
            signer: None,
        }
    }

    /// Use the provided configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Self {
        self.from_env = true;
        self
    }

    /// Set the trust anchor. `None` disables certificate verification.
    pub fn trust_anchor(mut self, trust_anchor: Option<TrustAnchor>) -> Self {
        self.trust_anchor = trust_anchor;
        self
    }

    /// Use a custom HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom credentials provider.
    pub fn credentials_provider(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials_provider = Some(provider);
        self
    }

    /// Use a custom signer.
    pub fn signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<AwsHttp, AwsHttpError> {
        let config = if let Some(config) = self.config {
            config
        } else if self.from_env {
            ClientConfig::builder().from_env().build()?
        } else {
            ClientConfig::builder().build()?
        };

        if self.trust_anchor.is_none() {
            warn!("No trust anchor configured; server certificates will not be verified");
        }

        let transport = self.transport.unwrap_or_else(|| {
            Arc::new(
                ReqwestTransport::builder()
                    .connect_timeout(config.connect_timeout)
                    .request_timeout(config.request_timeout)
                    .build(),
            )
        });

        Ok(AwsHttp {
            trust_anchor: self.trust_anchor,
            transport,
            credentials_provider: self
                .credentials_provider
                .unwrap_or_else(|| Arc::new(ChainCredentialsProvider::new())),
            signer: self.signer.unwrap_or_else(|| Arc::new(SigV4Signer::new())),
            resolver: EndpointResolver::new(config.endpoint_override),
            header_builder: HeaderBuilder::new(config.user_agent),
        })
    }
}

impl Default for AwsHttpBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::AwsCredentials;
    use crate::endpoint::parse_endpoint_uri;
    use crate::error::{CredentialsError, ErrorPhase};
    use crate::mocks::{
        MockCredentialsProvider, MockFailure, MockResponse, MockSigner, MockTransport,
        MOCK_SIGNATURE_HEADER,
    };

    struct Harness {
        client: AwsHttp,
        transport: MockTransport,
        signer: Arc<MockSigner>,
        credentials: Arc<MockCredentialsProvider>,
    }

    fn harness(transport: MockTransport) -> Harness {
        let signer = Arc::new(MockSigner::new());
        let credentials = Arc::new(MockCredentialsProvider::new());
        let client = AwsHttp::builder()
            .config(ClientConfig::default())
            .transport(Arc::new(transport.clone()))
            .signer(signer.clone())
            .credentials_provider(credentials.clone())
            .build()
            .unwrap();

        Harness {
            client,
            transport,
            signer,
            credentials,
        }
    }

    fn signing_config() -> SigningConfig {
        SigningConfig::new("us-east-1", "sts", AwsCredentials::new("AKID", "SECRET"))
    }

    fn endpoint() -> Endpoint {
        parse_endpoint_uri("https://sts.us-east-1.amazonaws.com").unwrap()
    }

    #[tokio::test]
    async fn test_url_is_plain_concatenation() {
        let h = harness(MockTransport::with_default(MockResponse::ok()));
        let request = Request::new("GET")
            .with_path("/a b")
            .with_query("?Action=GetCallerIdentity&Version=2011-06-15");

        h.client.make_request(&endpoint(), &request, None).await.unwrap();

        let sent = h.transport.last_request().unwrap();
        assert_eq!(sent.method, "GET");
        assert_eq!(
            sent.url,
            "https://sts.us-east-1.amazonaws.com/a b?Action=GetCallerIdentity&Version=2011-06-15"
        );
    }

    #[tokio::test]
    async fn test_empty_body_sent_as_none() {
        let h = harness(MockTransport::with_default(MockResponse::ok()));
        h.client
            .make_request(&endpoint(), &Request::new("GET"), None)
            .await
            .unwrap();

        let sent = h.transport.last_request().unwrap();
        assert!(sent.body.is_none());
        assert!(!sent.headers.iter().any(|h| h.is("content-length")));
    }

    #[tokio::test]
    async fn test_body_and_content_length() {
        let h = harness(MockTransport::with_default(MockResponse::ok()));
        let request = Request::default().with_body("{\"k\":\"v\"}");

        h.client.make_request(&endpoint(), &request, None).await.unwrap();

        let sent = h.transport.last_request().unwrap();
        assert_eq!(sent.body.as_deref(), Some(&b"{\"k\":\"v\"}"[..]));
        let lengths: Vec<_> = sent
            .headers
            .iter()
            .filter(|h| h.is("content-length"))
            .collect();
        assert_eq!(lengths.len(), 1);
        assert_eq!(lengths[0].value, "9");
    }

    #[tokio::test]
    async fn test_caller_request_untouched() {
        let h = harness(MockTransport::with_default(MockResponse::ok()));
        let request = Request::default().with_header("X-Custom", "1");
        let before = request.clone();

        h.client
            .make_request(&endpoint(), &request, Some(&signing_config()))
            .await
            .unwrap();

        assert_eq!(request, before);
    }

    #[tokio::test]
    async fn test_unsigned_request_skips_signer() {
        let h = harness(MockTransport::with_default(MockResponse::ok()));
        h.client
            .make_request(&endpoint(), &Request::default(), None)
            .await
            .unwrap();

        assert_eq!(h.signer.sign_count(), 0);
        assert_eq!(h.signer.release_count(), 0);
        let sent = h.transport.last_request().unwrap();
        assert!(!sent.headers.iter().any(|header| header.is(MOCK_SIGNATURE_HEADER)));
    }

    #[tokio::test]
    async fn test_signed_request_released_after_send() {
        let h = harness(MockTransport::with_default(MockResponse::ok()));
        h.client
            .make_request(&endpoint(), &Request::default(), Some(&signing_config()))
            .await
            .unwrap();

        assert_eq!(h.signer.sign_count(), 1);
        assert_eq!(h.signer.release_count(), 1);
        let sent = h.transport.last_request().unwrap();
        assert!(sent.headers.iter().any(|h| h.is(MOCK_SIGNATURE_HEADER)));
        assert_eq!(h.signer.released()[0].headers, sent.headers);
    }

    #[tokio::test]
    async fn test_release_on_every_transport_failure() {
        for failure in [MockFailure::Connect, MockFailure::Exchange, MockFailure::Read] {
            let h = harness(MockTransport::with_default(MockResponse::ok_with_body("x")));
            h.transport.fail_with(Some(failure));

            let err = h
                .client
                .make_request(&endpoint(), &Request::default(), Some(&signing_config()))
                .await
                .unwrap_err();

            assert_eq!(err.phase(), ErrorPhase::Transport);
            assert_eq!(h.signer.sign_count(), 1);
            assert_eq!(h.signer.release_count(), 1, "{:?}", failure);
        }
    }

    #[tokio::test]
    async fn test_signing_failure_not_released() {
        let h = harness(MockTransport::with_default(MockResponse::ok()));
        h.signer.set_failing(true);

        let err = h
            .client
            .make_request(&endpoint(), &Request::default(), Some(&signing_config()))
            .await
            .unwrap_err();

        assert_eq!(err.phase(), ErrorPhase::Signing);
        assert_eq!(h.signer.release_count(), 0);
        assert_eq!(h.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_response_collected() {
        let response = MockResponse::error(404, "{\"message\":\"not found\"}")
            .with_header("Content-Length", "23")
            .with_header("x-amzn-RequestId", "abc");
        let h = harness(MockTransport::with_default(response).with_read_chunk_size(5));

        let result = h
            .client
            .make_request(&endpoint(), &Request::default(), None)
            .await
            .unwrap();

        assert_eq!(result.response_code, 404);
        assert!(!result.is_success());
        assert_eq!(result.body_str(), Some("{\"message\":\"not found\"}"));
        assert_eq!(result.header("X-AMZN-REQUESTID"), Some("abc"));
    }

    #[tokio::test]
    async fn test_bad_content_length_not_fatal() {
        let response = MockResponse::ok_with_body("hello").with_header("Content-Length", "five");
        let h = harness(MockTransport::with_default(response));

        let result = h
            .client
            .make_request(&endpoint(), &Request::default(), None)
            .await
            .unwrap();
        assert_eq!(result.body_str(), Some("hello"));
    }

    #[tokio::test]
    async fn test_invalid_status() {
        let h = harness(MockTransport::with_default(MockResponse::error(1000, "")));
        let err = h
            .client
            .make_request(&endpoint(), &Request::default(), Some(&signing_config()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AwsHttpError::Response(ResponseError::InvalidStatus { status: 1000 })
        ));
        assert_eq!(h.signer.release_count(), 1);
    }

    #[tokio::test]
    async fn test_call_api_signs_with_options() {
        let h = harness(MockTransport::with_default(MockResponse::ok()));
        let options = Options::default().with_sigv4_service_name("execute-api");

        h.client
            .call_api("apigateway", &Request::default(), &options)
            .await
            .unwrap();

        let sent = h.transport.last_request().unwrap();
        assert!(sent.url.starts_with("https://apigateway.us-east-1.amazonaws.com/"));
        let signature = sent
            .headers
            .iter()
            .find(|h| h.is(MOCK_SIGNATURE_HEADER))
            .unwrap();
        assert_eq!(signature.value, "aws-global/execute-api");
        assert_eq!(h.credentials.call_count(), 1);
    }

    #[tokio::test]
    async fn test_call_api_credentials_failure() {
        let h = harness(MockTransport::with_default(MockResponse::ok()));
        h.credentials.set_credentials(None);

        let err = h
            .client
            .call_api("sts", &Request::default(), &Options::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AwsHttpError::Credentials(CredentialsError::NotFound)
        ));
        assert_eq!(h.signer.sign_count(), 0);
        assert_eq!(h.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_call_api_bad_override() {
        let transport = MockTransport::with_default(MockResponse::ok());
        let client = AwsHttp::builder()
            .config(
                ClientConfig::builder()
                    .endpoint_override("http://localhost:port")
                    .build()
                    .unwrap(),
            )
            .transport(Arc::new(transport.clone()))
            .credentials_provider(Arc::new(MockCredentialsProvider::new()))
            .build()
            .unwrap();

        let err = client
            .call_api("sts", &Request::default(), &Options::default())
            .await
            .unwrap_err();
        assert_eq!(err.phase(), ErrorPhase::Resolution);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_trust_anchor_handed_to_transport() {
        let transport = MockTransport::with_default(MockResponse::ok());
        let client = AwsHttp::builder()
            .config(ClientConfig::default())
            .trust_anchor(None)
            .transport(Arc::new(transport.clone()))
            .build()
            .unwrap();
        assert!(client.trust_anchor().is_none());

        client
            .make_request(&endpoint(), &Request::default(), None)
            .await
            .unwrap();
        assert_eq!(transport.trust_anchors(), vec![None]);
    }

    #[test]
    fn test_body_capacity_hint() {
        assert_eq!(body_capacity_hint(&[]), 0);
        assert_eq!(
            body_capacity_hint(&[Header::new("content-length", "42")]),
            42
        );
        assert_eq!(
            body_capacity_hint(&[Header::new("Content-Length", "-1")]),
            0
        );
        assert_eq!(
            body_capacity_hint(&[Header::new("Content-Length", "99999999999")]),
            MAX_BODY_PREALLOCATION
        );
    }

    #[test]
    fn test_init_rejects_bad_pem() {
        let err = AwsHttp::init(Some(&b"garbage"[..])).unwrap_err();
        assert_eq!(err.phase(), ErrorPhase::Setup);
    }
}
