//! Signing configuration handed to a [`RequestSigner`](super::RequestSigner).

use crate::credentials::AwsCredentials;
use chrono::{DateTime, Utc};

/// Signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningAlgorithm {
    /// AWS Signature Version 4 with HMAC-SHA256.
    #[default]
    SigV4,
}

/// Where the signature is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureType {
    /// `Authorization` header.
    #[default]
    Headers,
    /// `X-Amz-*` query parameters.
    QueryParams,
}

/// Whether the payload hash is emitted as a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignedBodyHeader {
    /// No body hash header.
    #[default]
    None,
    /// `X-Amz-Content-Sha256`.
    XAmzContentSha256,
}

/// Canonicalization switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningFlags {
    /// Encode the (already encoded) path a second time in the canonical URI.
    /// Most services expect this; S3 does not.
    pub use_double_uri_encode: bool,
    /// Drop `.`/`..` and empty path segments from the canonical URI.
    pub should_normalize_uri_path: bool,
    /// Add `X-Amz-Security-Token` to the request but leave it out of the
    /// canonical request.
    pub omit_session_token: bool,
}

impl Default for SigningFlags {
    fn default() -> Self {
        Self {
            use_double_uri_encode: false,
            should_normalize_uri_path: true,
            omit_session_token: false,
        }
    }
}

/// Everything a signer needs to sign one request.
///
/// The signing date is captured when the config is created.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    /// Signature algorithm.
    pub algorithm: SigningAlgorithm,
    /// Header or query-parameter signing.
    pub signature_type: SignatureType,
    /// Region in the credential scope.
    pub region: String,
    /// Service in the credential scope.
    pub service: String,
    /// Credentials to sign with.
    pub credentials: AwsCredentials,
    /// Precomputed payload hash or a special value such as `UNSIGNED-PAYLOAD`.
    /// When `None` the SHA-256 of the body is used.
    pub signed_body_value: Option<String>,
    /// Body hash header mode.
    pub signed_body_header: SignedBodyHeader,
    /// Canonicalization switches.
    pub flags: SigningFlags,
    /// `X-Amz-Expires` for query-parameter signing.
    pub expiration_in_seconds: Option<u64>,
    /// Signing timestamp.
    pub date: DateTime<Utc>,
}

impl SigningConfig {
    /// Create a header-signing SigV4 config dated now.
    pub fn new(
        region: impl Into<String>,
        service: impl Into<String>,
        credentials: AwsCredentials,
    ) -> Self {
        Self {
            algorithm: SigningAlgorithm::SigV4,
            signature_type: SignatureType::Headers,
            region: region.into(),
            service: service.into(),
            credentials,
            signed_body_value: None,
            signed_body_header: SignedBodyHeader::None,
            flags: SigningFlags::default(),
            expiration_in_seconds: None,
            date: Utc::now(),
        }
    }

    /// Set the signature placement.
    pub fn with_signature_type(mut self, signature_type: SignatureType) -> Self {
        self.signature_type = signature_type;
        self
    }

    /// Use a fixed payload hash value.
    pub fn with_signed_body_value(mut self, value: impl Into<String>) -> Self {
        self.signed_body_value = Some(value.into());
        self
    }

    /// Set the body hash header mode.
    pub fn with_signed_body_header(mut self, header: SignedBodyHeader) -> Self {
        self.signed_body_header = header;
        self
    }

    /// Set the canonicalization switches.
    pub fn with_flags(mut self, flags: SigningFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set `X-Amz-Expires` for query-parameter signing.
    pub fn with_expiration(mut self, seconds: u64) -> Self {
        self.expiration_in_seconds = Some(seconds);
        self
    }

    /// Pin the signing timestamp.
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }
}
