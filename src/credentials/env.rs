//! Credentials from environment variables.

use super::{AwsCredentials, CredentialsProvider};
use crate::error::{AwsHttpError, CredentialsError};
use async_trait::async_trait;
use std::env;

/// Access key ID variable.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Secret access key variable.
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// Session token variable.
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// Reads `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and the optional
/// `AWS_SESSION_TOKEN`.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialsProvider;

impl EnvCredentialsProvider {
    /// Create a new environment credentials provider.
    pub fn new() -> Self {
        Self
    }

    fn required(name: &str) -> Result<String, AwsHttpError> {
        let value = env::var(name).map_err(|_| CredentialsError::NotFound)?;
        if value.is_empty() {
            return Err(CredentialsError::Invalid {
                message: format!("{} is empty", name),
            }
            .into());
        }
        Ok(value)
    }
}

#[async_trait]
impl CredentialsProvider for EnvCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, AwsHttpError> {
        let access_key_id = Self::required(AWS_ACCESS_KEY_ID)?;
        let secret_access_key = Self::required(AWS_SECRET_ACCESS_KEY)?;

        let credentials = AwsCredentials::new(access_key_id, secret_access_key);
        match env::var(AWS_SESSION_TOKEN).ok().filter(|t| !t.is_empty()) {
            Some(token) => Ok(credentials.with_session_token(token)),
            None => Ok(credentials),
        }
    }

    fn name(&self) -> &'static str {
        "environment"
    }
}
