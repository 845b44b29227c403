//! Credential retrieval.
//!
//! The client asks a [`CredentialsProvider`] for credentials once per
//! `call_api` and hands them to the signer through a
//! [`SigningConfig`](crate::signing::SigningConfig). Credentials are otherwise
//! opaque to the transport.

mod chain;
mod env;
mod profile;

pub use chain::ChainCredentialsProvider;
pub use env::EnvCredentialsProvider;
pub use profile::ProfileCredentialsProvider;

use crate::error::{AwsHttpError, CredentialsError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// AWS access credentials.
#[derive(Clone)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
    expiration: Option<DateTime<Utc>>,
}

impl AwsCredentials {
    /// Create long-term credentials.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
            session_token: None,
            expiration: None,
        }
    }

    /// Attach a session token, making these temporary credentials.
    pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(SecretString::new(session_token.into()));
        self
    }

    /// Attach an expiration time.
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// The access key ID.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The secret access key. Never log this.
    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    /// The session token, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_ref().map(|s| s.expose_secret().as_str())
    }

    /// The expiration time, if any.
    pub fn expiration(&self) -> Option<&DateTime<Utc>> {
        self.expiration.as_ref()
    }

    /// True once the expiration time has passed.
    pub fn is_expired(&self) -> bool {
        self.expiration.map_or(false, |exp| Utc::now() >= exp)
    }

    /// True if the credentials expire within `window`.
    pub fn expires_within(&self, window: chrono::Duration) -> bool {
        self.expiration.map_or(false, |exp| Utc::now() + window >= exp)
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Source of credentials for signed calls.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Retrieve credentials.
    async fn get_credentials(&self) -> Result<AwsCredentials, AwsHttpError>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// Provider that always returns the same credentials.
pub struct StaticCredentialsProvider {
    credentials: AwsCredentials,
}

impl StaticCredentialsProvider {
    /// Create a provider for fixed credentials.
    pub fn new(credentials: AwsCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, AwsHttpError> {
        if self.credentials.is_expired() {
            let expiration = self
                .credentials
                .expiration()
                .map(|e| e.to_rfc3339())
                .unwrap_or_default();
            return Err(CredentialsError::Expired { expiration }.into());
        }
        Ok(self.credentials.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

impl fmt::Debug for StaticCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialsProvider")
            .field("credentials", &self.credentials)
            .finish()
    }
}
