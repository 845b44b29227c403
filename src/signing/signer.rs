//! AWS Signature V4 signer.

use super::canonical::{
    canonical_header_map, canonical_query, canonical_request, canonical_uri, parse_query,
    signed_headers, uri_encode,
};
use super::{
    credential_scope, derive_signing_key, format_date_stamp, format_datetime, hmac_sha256,
    sha256_hex, SignatureType, SignedBodyHeader, SigningConfig, AWS_ALGORITHM,
};
use crate::error::{AwsHttpError, SigningError};
use crate::types::{Header, Request};
use async_trait::async_trait;
use tracing::{debug, trace};
use url::Url;

/// Signs requests in place.
///
/// Every successful [`sign`](Self::sign) is paired with exactly one
/// [`release_signed`](Self::release_signed) once the request has been sent or
/// the send has failed. A failed `sign` is not released; the signer cleans up
/// its own partial state before returning the error.
#[async_trait]
pub trait RequestSigner: Send + Sync {
    /// Add signature headers or query parameters to `request`.
    async fn sign(&self, request: Request, config: &SigningConfig)
        -> Result<Request, AwsHttpError>;

    /// Release whatever `sign` attached to the request.
    fn release_signed(&self, request: Request, config: &SigningConfig);
}

/// SigV4 signer.
///
/// Header signing adds `X-Amz-Date`, optionally `X-Amz-Content-Sha256` and
/// `X-Amz-Security-Token`, then `Authorization`. Query signing appends the
/// `X-Amz-*` parameters to the request's query string and leaves the headers
/// alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigV4Signer;

impl SigV4Signer {
    /// Create a signer.
    pub fn new() -> Self {
        Self
    }

    fn validate(request: &Request, config: &SigningConfig) -> Result<(), SigningError> {
        if config.region.is_empty() {
            return Err(SigningError::InitiationFailed {
                message: "signing region is empty".to_string(),
            });
        }
        if config.service.is_empty() {
            return Err(SigningError::InitiationFailed {
                message: "signing service is empty".to_string(),
            });
        }
        if config.credentials.access_key_id().is_empty() {
            return Err(SigningError::InitiationFailed {
                message: "access key id is empty".to_string(),
            });
        }
        if request.method.is_empty() {
            return Err(SigningError::Signable {
                message: "request method is empty".to_string(),
            });
        }
        let host = request.header("host").ok_or_else(|| SigningError::Signable {
            message: "request has no Host header".to_string(),
        })?;

        let url = format!("https://{}{}{}", host, request.path, request.query);
        Url::parse(&url).map_err(|e| SigningError::Signable {
            message: format!("invalid request URL '{}': {}", url, e),
        })?;
        Ok(())
    }

    fn signature(
        config: &SigningConfig,
        amz_date: &str,
        date_stamp: &str,
        scope: &str,
        canonical_request: &str,
    ) -> Result<String, SigningError> {
        trace!(canonical_request = %canonical_request, "Canonical request");

        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            AWS_ALGORITHM,
            amz_date,
            scope,
            sha256_hex(canonical_request.as_bytes())
        );
        let key = derive_signing_key(
            config.credentials.secret_access_key(),
            date_stamp,
            &config.region,
            &config.service,
        )?;
        Ok(hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?))
    }

    fn sign_headers(
        mut request: Request,
        config: &SigningConfig,
        payload_hash: &str,
    ) -> Result<Request, SigningError> {
        let amz_date = format_datetime(&config.date);
        let date_stamp = format_date_stamp(&config.date);
        let scope = credential_scope(&date_stamp, &config.region, &config.service);
        let token = config.credentials.session_token();

        request.headers.push(Header::new("X-Amz-Date", amz_date.as_str()));
        if config.signed_body_header == SignedBodyHeader::XAmzContentSha256 {
            request
                .headers
                .push(Header::new("X-Amz-Content-Sha256", payload_hash));
        }
        if let (Some(token), false) = (token, config.flags.omit_session_token) {
            request.headers.push(Header::new("X-Amz-Security-Token", token));
        }

        let header_map = canonical_header_map(&request.headers);
        let canonical = canonical_request(
            &request.method,
            &canonical_uri(
                &request.path,
                config.flags.should_normalize_uri_path,
                config.flags.use_double_uri_encode,
            ),
            &canonical_query(&parse_query(&request.query)),
            &header_map,
            payload_hash,
        );
        let signature = Self::signature(config, &amz_date, &date_stamp, &scope, &canonical)?;

        if let (Some(token), true) = (token, config.flags.omit_session_token) {
            request.headers.push(Header::new("X-Amz-Security-Token", token));
        }
        request.headers.push(Header::new(
            "Authorization",
            format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                AWS_ALGORITHM,
                config.credentials.access_key_id(),
                scope,
                signed_headers(&header_map),
                signature
            ),
        ));

        Ok(request)
    }

    fn sign_query(
        mut request: Request,
        config: &SigningConfig,
        payload_hash: &str,
    ) -> Result<Request, SigningError> {
        let amz_date = format_datetime(&config.date);
        let date_stamp = format_date_stamp(&config.date);
        let scope = credential_scope(&date_stamp, &config.region, &config.service);
        let token = config.credentials.session_token();
        let header_map = canonical_header_map(&request.headers);

        let mut added: Vec<(String, String)> = vec![
            ("X-Amz-Algorithm".to_string(), AWS_ALGORITHM.to_string()),
            (
                "X-Amz-Credential".to_string(),
                format!("{}/{}", config.credentials.access_key_id(), scope),
            ),
            ("X-Amz-Date".to_string(), amz_date.clone()),
            ("X-Amz-SignedHeaders".to_string(), signed_headers(&header_map)),
        ];
        if let Some(expires) = config.expiration_in_seconds {
            added.push(("X-Amz-Expires".to_string(), expires.to_string()));
        }
        if let (Some(token), false) = (token, config.flags.omit_session_token) {
            added.push(("X-Amz-Security-Token".to_string(), token.to_string()));
        }

        let mut params = parse_query(&request.query);
        params.extend(added.iter().cloned());

        let canonical = canonical_request(
            &request.method,
            &canonical_uri(
                &request.path,
                config.flags.should_normalize_uri_path,
                config.flags.use_double_uri_encode,
            ),
            &canonical_query(&params),
            &header_map,
            payload_hash,
        );
        let signature = Self::signature(config, &amz_date, &date_stamp, &scope, &canonical)?;

        if let (Some(token), true) = (token, config.flags.omit_session_token) {
            added.push(("X-Amz-Security-Token".to_string(), token.to_string()));
        }
        added.push(("X-Amz-Signature".to_string(), signature));

        request.query = append_query(&request.query, &added);
        Ok(request)
    }
}

/// Append encoded parameters to a query string that may or may not carry its
/// leading `?`.
fn append_query(query: &str, params: &[(String, String)]) -> String {
    let encoded = params
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    if query.trim_start_matches('?').is_empty() {
        format!("?{}", encoded)
    } else {
        format!("{}&{}", query, encoded)
    }
}

#[async_trait]
impl RequestSigner for SigV4Signer {
    async fn sign(
        &self,
        request: Request,
        config: &SigningConfig,
    ) -> Result<Request, AwsHttpError> {
        Self::validate(&request, config)?;

        let payload_hash = config
            .signed_body_value
            .clone()
            .unwrap_or_else(|| sha256_hex(&request.body));

        debug!(
            region = %config.region,
            service = %config.service,
            signature_type = ?config.signature_type,
            "Signing request"
        );

        let signed = match config.signature_type {
            SignatureType::Headers => Self::sign_headers(request, config, &payload_hash)?,
            SignatureType::QueryParams => Self::sign_query(request, config, &payload_hash)?,
        };
        Ok(signed)
    }

    fn release_signed(&self, request: Request, config: &SigningConfig) {
        trace!(
            service = %config.service,
            headers = request.headers.len(),
            "Releasing signed request"
        );
        drop(request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::AwsCredentials;
    use chrono::{TimeZone, Utc};

    fn vanilla_request() -> Request {
        Request::new("GET").with_header("Host", "example.amazonaws.com")
    }

    fn vanilla_config() -> SigningConfig {
        SigningConfig::new(
            "us-east-1",
            "service",
            AwsCredentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
        )
        .with_date(Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap())
    }

    #[tokio::test]
    async fn test_get_vanilla() {
        let signed = SigV4Signer::new()
            .sign(vanilla_request(), &vanilla_config())
            .await
            .unwrap();

        assert_eq!(signed.header("X-Amz-Date"), Some("20150830T123600Z"));
        assert_eq!(
            signed.header("Authorization"),
            Some(
                "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
                 SignedHeaders=host;x-amz-date, \
                 Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
            )
        );
    }

    #[tokio::test]
    async fn test_user_agent_not_signed() {
        let request = vanilla_request().with_header("User-Agent", "aws-http/0.1.0");
        let signed = SigV4Signer::new()
            .sign(request, &vanilla_config())
            .await
            .unwrap();

        let auth = signed.header("Authorization").unwrap();
        assert!(auth.contains("SignedHeaders=host;x-amz-date,"));
    }

    #[tokio::test]
    async fn test_session_token_and_body_hash_headers() {
        let creds = AwsCredentials::new("AKID", "SECRET").with_session_token("TOKEN");
        let config = SigningConfig::new("us-west-2", "sts", creds)
            .with_signed_body_header(SignedBodyHeader::XAmzContentSha256);
        let request = vanilla_request().with_body("Action=GetCallerIdentity");

        let signed = SigV4Signer::new().sign(request, &config).await.unwrap();

        assert_eq!(signed.header("X-Amz-Security-Token"), Some("TOKEN"));
        assert_eq!(
            signed.header("X-Amz-Content-Sha256"),
            Some(sha256_hex(b"Action=GetCallerIdentity").as_str())
        );
        let auth = signed.header("Authorization").unwrap();
        assert!(auth.contains(
            "SignedHeaders=host;x-amz-content-sha256;x-amz-date;x-amz-security-token,"
        ));
    }

    #[tokio::test]
    async fn test_omitted_session_token_is_not_signed() {
        let creds = AwsCredentials::new("AKID", "SECRET").with_session_token("TOKEN");
        let mut config = SigningConfig::new("us-east-1", "iot", creds);
        config.flags.omit_session_token = true;

        let signed = SigV4Signer::new()
            .sign(vanilla_request(), &config)
            .await
            .unwrap();

        assert_eq!(signed.header("X-Amz-Security-Token"), Some("TOKEN"));
        assert!(signed
            .header("Authorization")
            .unwrap()
            .contains("SignedHeaders=host;x-amz-date,"));
    }

    #[tokio::test]
    async fn test_query_signing() {
        let config = vanilla_config()
            .with_signature_type(SignatureType::QueryParams)
            .with_signed_body_value(super::super::UNSIGNED_PAYLOAD)
            .with_expiration(900);
        let request = vanilla_request().with_query("?Action=ListUsers");

        let signed = SigV4Signer::new().sign(request, &config).await.unwrap();

        assert!(signed.header("Authorization").is_none());
        assert!(signed.query.starts_with("?Action=ListUsers&X-Amz-Algorithm=AWS4-HMAC-SHA256"));
        assert!(signed
            .query
            .contains("X-Amz-Credential=AKIDEXAMPLE%2F20150830%2Fus-east-1%2Fservice%2Faws4_request"));
        assert!(signed.query.contains("X-Amz-Expires=900"));
        assert!(signed.query.contains("X-Amz-SignedHeaders=host"));
        assert!(signed.query.contains("&X-Amz-Signature="));
    }

    #[tokio::test]
    async fn test_query_signing_empty_query() {
        let config = vanilla_config().with_signature_type(SignatureType::QueryParams);
        let signed = SigV4Signer::new()
            .sign(vanilla_request(), &config)
            .await
            .unwrap();

        assert!(signed.query.starts_with("?X-Amz-Algorithm="));
    }

    #[tokio::test]
    async fn test_empty_region_fails_initiation() {
        let config = SigningConfig::new("", "sts", AwsCredentials::new("AKID", "SECRET"));
        let err = SigV4Signer::new()
            .sign(vanilla_request(), &config)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AwsHttpError::Signing(SigningError::InitiationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_host_not_signable() {
        let err = SigV4Signer::new()
            .sign(Request::new("GET"), &vanilla_config())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AwsHttpError::Signing(SigningError::Signable { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_host_not_signable() {
        let request = Request::new("GET").with_header("Host", "bad host");
        let err = SigV4Signer::new()
            .sign(request, &vanilla_config())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AwsHttpError::Signing(SigningError::Signable { .. })
        ));
    }

    #[test]
    fn test_append_query() {
        let params = vec![("a".to_string(), "b c".to_string())];
        assert_eq!(append_query("", &params), "?a=b%20c");
        assert_eq!(append_query("?", &params), "?a=b%20c");
        assert_eq!(append_query("?x=1", &params), "?x=1&a=b%20c");
    }
}
