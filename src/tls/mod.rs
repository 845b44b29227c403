//! Trust anchors for TLS peer verification.

use crate::error::TlsError;
use std::io::BufReader;

/// Root certificates used to verify the server.
#[derive(Clone, PartialEq, Eq)]
pub enum TrustAnchor {
    /// The Mozilla root set compiled into the TLS backend.
    Bundled,
    /// DER-encoded root certificates.
    Certificates(Vec<Vec<u8>>),
}

impl TrustAnchor {
    /// Parse every `CERTIFICATE` block from PEM data.
    ///
    /// Other PEM sections (keys, CRLs) are skipped.
    pub fn from_pem(pem: &[u8]) -> Result<Self, TlsError> {
        let mut reader = BufReader::new(pem);
        let certificates = rustls_pemfile::certs(&mut reader)
            .map(|cert| cert.map(|der| der.as_ref().to_vec()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TlsError::InvalidPem {
                message: e.to_string(),
            })?;

        if certificates.is_empty() {
            return Err(TlsError::NoCertificates);
        }
        Ok(TrustAnchor::Certificates(certificates))
    }

    /// Number of explicit certificates; `None` for the bundled set.
    pub fn certificate_count(&self) -> Option<usize> {
        match self {
            TrustAnchor::Bundled => None,
            TrustAnchor::Certificates(certs) => Some(certs.len()),
        }
    }
}

impl Default for TrustAnchor {
    fn default() -> Self {
        TrustAnchor::Bundled
    }
}

impl std::fmt::Debug for TrustAnchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrustAnchor::Bundled => f.write_str("TrustAnchor::Bundled"),
            TrustAnchor::Certificates(certs) => f
                .debug_struct("TrustAnchor::Certificates")
                .field("count", &certs.len())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_CERT: &str = "-----BEGIN CERTIFICATE-----\nMIIBAA==\n-----END CERTIFICATE-----\n";

    #[test]
    fn test_parse_certificates() {
        let pem = format!("{}{}", ONE_CERT, ONE_CERT);
        let anchor = TrustAnchor::from_pem(pem.as_bytes()).unwrap();
        assert_eq!(anchor.certificate_count(), Some(2));

        match anchor {
            TrustAnchor::Certificates(certs) => assert_eq!(certs[0], vec![0x30, 0x82, 0x01, 0x00]),
            TrustAnchor::Bundled => panic!("expected explicit certificates"),
        }
    }

    #[test]
    fn test_no_certificates() {
        assert!(matches!(
            TrustAnchor::from_pem(b"not a pem file"),
            Err(TlsError::NoCertificates)
        ));
        assert!(matches!(
            TrustAnchor::from_pem(b""),
            Err(TlsError::NoCertificates)
        ));
    }

    #[test]
    fn test_unterminated_section() {
        let pem = b"-----BEGIN CERTIFICATE-----\nMIIBAA==\n";
        assert!(matches!(
            TrustAnchor::from_pem(pem),
            Err(TlsError::InvalidPem { .. })
        ));
    }

    #[test]
    fn test_bundled_default() {
        assert_eq!(TrustAnchor::default(), TrustAnchor::Bundled);
        assert_eq!(TrustAnchor::Bundled.certificate_count(), None);
    }
}
