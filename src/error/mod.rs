//! Error types for the AWS HTTP transport.
//!
//! Errors are grouped by the phase of a call that produced them so callers can
//! tell a bad override URI from a credential failure from a dropped connection.

use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the transport.
#[derive(Debug, Error)]
pub enum AwsHttpError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Endpoint resolution errors.
    #[error("Endpoint error: {0}")]
    Endpoint(#[from] EndpointError),

    /// Trust anchor and TLS setup errors.
    #[error("TLS error: {0}")]
    Tls(#[from] TlsError),

    /// Credential-related errors.
    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    /// Request signing errors.
    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    /// Network and transport errors.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Response interpretation errors.
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),
}

/// The phase of a call in which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPhase {
    /// Client construction or configuration.
    Setup,
    /// Endpoint resolution.
    Resolution,
    /// Credential retrieval.
    Credentials,
    /// Request signing.
    Signing,
    /// Connection, exchange or body read.
    Transport,
    /// Status interpretation.
    Status,
}

impl AwsHttpError {
    /// Returns the phase that produced this error.
    pub fn phase(&self) -> ErrorPhase {
        match self {
            AwsHttpError::Configuration(_) | AwsHttpError::Tls(_) => ErrorPhase::Setup,
            AwsHttpError::Endpoint(_) => ErrorPhase::Resolution,
            AwsHttpError::Credentials(_) => ErrorPhase::Credentials,
            AwsHttpError::Signing(_) => ErrorPhase::Signing,
            AwsHttpError::Network(_) => ErrorPhase::Transport,
            AwsHttpError::Response(_) => ErrorPhase::Status,
        }
    }

    /// Returns true if the error is transient.
    ///
    /// Nothing in this crate retries; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            AwsHttpError::Network(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfiguration {
        /// The configuration field name.
        field: String,
        /// Error message.
        message: String,
    },
}

/// Endpoint resolution errors.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The override URI carries a port segment that is not a 16-bit integer.
    #[error("Invalid endpoint URI '{uri}': port segment '{port}' is not a valid port")]
    UriParse {
        /// The URI being parsed.
        uri: String,
        /// The offending port segment.
        port: String,
    },
}

/// Trust anchor errors.
#[derive(Debug, Error)]
pub enum TlsError {
    /// The PEM data could not be parsed.
    #[error("Invalid PEM trust anchor: {message}")]
    InvalidPem {
        /// Details about the parse failure.
        message: String,
    },

    /// The PEM data contained no certificates.
    #[error("Trust anchor contains no certificates")]
    NoCertificates,

    /// The TLS backend rejected the configuration.
    #[error("TLS setup failed: {message}")]
    Setup {
        /// Details about the failure.
        message: String,
    },
}

/// Credential-related errors.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// No credentials could be found.
    #[error("Credentials not found: no credentials could be loaded from any source")]
    NotFound,

    /// Credentials have expired.
    #[error("Credentials expired: session credentials expired at {expiration}")]
    Expired {
        /// When the credentials expired.
        expiration: String,
    },

    /// Credentials are invalid.
    #[error("Invalid credentials: {message}")]
    Invalid {
        /// Details about why credentials are invalid.
        message: String,
    },

    /// Profile configuration error.
    #[error("Profile error: {message}")]
    ProfileError {
        /// Details about the profile error.
        message: String,
    },
}

/// Request signing errors.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The signing configuration cannot start a signing pass.
    #[error("Signing initiation failed: {message}")]
    InitiationFailed {
        /// Details about the configuration problem.
        message: String,
    },

    /// The request cannot be turned into a signable form.
    #[error("Request is not signable: {message}")]
    Signable {
        /// Details about the request problem.
        message: String,
    },

    /// Signature calculation failed.
    #[error("Signature calculation failed: {message}")]
    CalculationFailed {
        /// Details about the calculation error.
        message: String,
    },
}

/// Network and transport errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection could not be established.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Details about the connection failure.
        message: String,
    },

    /// The request timed out.
    #[error("Request timed out after {duration:?}")]
    Timeout {
        /// The configured timeout that elapsed.
        duration: Duration,
    },

    /// The request could not be expressed on the wire.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Details about the invalid request.
        message: String,
    },

    /// The HTTP exchange failed after the connection was established.
    #[error("HTTP exchange failed: {message}")]
    ExchangeFailed {
        /// Details about the failure.
        message: String,
    },

    /// Reading the response body failed.
    #[error("Failed to read response body: {message}")]
    BodyRead {
        /// Details about the failure.
        message: String,
    },

    /// Response data was requested before an exchange completed.
    #[error("No response available on this connection")]
    NoResponse,
}

impl NetworkError {
    /// Returns true if the error is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetworkError::ConnectionFailed { .. }
                | NetworkError::Timeout { .. }
                | NetworkError::BodyRead { .. }
        )
    }
}

/// Response interpretation errors.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The transport reported a status code outside the HTTP range.
    #[error("Invalid HTTP status code: {status}")]
    InvalidStatus {
        /// The reported status.
        status: u16,
    },
}
