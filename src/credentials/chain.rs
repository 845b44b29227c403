//! Provider chain: the default credential source.

use super::{AwsCredentials, CredentialsProvider, EnvCredentialsProvider, ProfileCredentialsProvider};
use crate::error::{AwsHttpError, CredentialsError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

/// Seconds before expiry at which cached credentials are reloaded.
const DEFAULT_REFRESH_BUFFER_SECONDS: i64 = 300;

/// Tries each provider in order until one returns credentials.
///
/// The default chain is environment variables, then the shared credentials
/// file. The winning credentials are cached until they come within the refresh
/// buffer of their expiry.
pub struct ChainCredentialsProvider {
    providers: Vec<Arc<dyn CredentialsProvider>>,
    cached: RwLock<Option<AwsCredentials>>,
    refresh_buffer_seconds: i64,
}

impl ChainCredentialsProvider {
    /// Create the default chain.
    pub fn new() -> Self {
        Self::with_providers(vec![
            Arc::new(EnvCredentialsProvider::new()),
            Arc::new(ProfileCredentialsProvider::new()),
        ])
    }

    /// Create a chain of custom providers.
    pub fn with_providers(providers: Vec<Arc<dyn CredentialsProvider>>) -> Self {
        Self {
            providers,
            cached: RwLock::new(None),
            refresh_buffer_seconds: DEFAULT_REFRESH_BUFFER_SECONDS,
        }
    }

    /// Set how long before expiry cached credentials are reloaded.
    pub fn with_refresh_buffer(mut self, seconds: i64) -> Self {
        self.refresh_buffer_seconds = seconds;
        self
    }

    fn cached(&self) -> Option<AwsCredentials> {
        let window = chrono::Duration::seconds(self.refresh_buffer_seconds);
        self.cached
            .read()
            .as_ref()
            .filter(|creds| !creds.is_expired() && !creds.expires_within(window))
            .cloned()
    }
}

impl Default for ChainCredentialsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialsProvider for ChainCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, AwsHttpError> {
        if let Some(creds) = self.cached() {
            trace!("Using cached credentials");
            return Ok(creds);
        }

        let mut last_error = None;
        for provider in &self.providers {
            trace!(provider = provider.name(), "Trying credentials provider");
            match provider.get_credentials().await {
                Ok(creds) => {
                    debug!(provider = provider.name(), "Credentials loaded");
                    *self.cached.write() = Some(creds.clone());
                    return Ok(creds);
                }
                Err(e) => {
                    trace!(provider = provider.name(), error = %e, "Provider failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CredentialsError::NotFound.into()))
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

impl std::fmt::Debug for ChainCredentialsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainCredentialsProvider")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("refresh_buffer_seconds", &self.refresh_buffer_seconds)
            .finish()
    }
}
