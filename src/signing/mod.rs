//! Request signing.
//!
//! The client talks to signers through [`RequestSigner`]. [`sign_request`]
//! wraps a signing pass in a [`SignedRequest`] guard so the signer's release
//! routine runs exactly once, on every exit path, after the transport is done
//! with the request. [`SigV4Signer`] is the default signer.

mod adapter;
mod canonical;
mod config;
mod signer;

pub use adapter::{sign_request, SignedRequest};
pub use canonical::{canonical_query, canonical_uri, parse_query, uri_encode};
pub use config::{SignatureType, SignedBodyHeader, SigningAlgorithm, SigningConfig, SigningFlags};
pub use signer::{RequestSigner, SigV4Signer};

use crate::error::SigningError;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// SigV4 algorithm identifier.
pub const AWS_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Payload hash value for bodies that are not hashed.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Hex-encoded SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// HMAC-SHA256 of `data` under `key`.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SigningError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| SigningError::CalculationFailed {
            message: e.to_string(),
        })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the SigV4 signing key.
///
/// kDate = HMAC("AWS4" + secret, date); kRegion = HMAC(kDate, region);
/// kService = HMAC(kRegion, service); kSigning = HMAC(kService, "aws4_request")
pub fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, SigningError> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// `{date}/{region}/{service}/aws4_request`
pub fn credential_scope(date_stamp: &str, region: &str, service: &str) -> String {
    format!("{}/{}/{}/aws4_request", date_stamp, region, service)
}

/// `YYYYMMDD'T'HHMMSS'Z'`
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// `YYYYMMDD`
pub fn format_date_stamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%d").to_string()
}
