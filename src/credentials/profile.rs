//! Credentials from the shared credentials file.

use super::{AwsCredentials, CredentialsProvider};
use crate::error::{AwsHttpError, CredentialsError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::{env, fs};

/// Profile used when none is named.
pub const DEFAULT_PROFILE: &str = "default";

/// Profile selection variable.
pub const AWS_PROFILE: &str = "AWS_PROFILE";

/// Credentials file location variable.
pub const AWS_SHARED_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";

type Profiles = HashMap<String, HashMap<String, String>>;

/// Reads a profile from `~/.aws/credentials` or `AWS_SHARED_CREDENTIALS_FILE`.
///
/// The profile is the one passed to [`with_profile`](Self::with_profile), else
/// `AWS_PROFILE`, else `default`.
#[derive(Debug, Clone)]
pub struct ProfileCredentialsProvider {
    profile_name: String,
    credentials_file: Option<PathBuf>,
}

impl ProfileCredentialsProvider {
    /// Create a provider for `AWS_PROFILE` or the default profile.
    pub fn new() -> Self {
        let profile_name = env::var(AWS_PROFILE).unwrap_or_else(|_| DEFAULT_PROFILE.to_string());
        Self::with_profile(profile_name)
    }

    /// Create a provider for a named profile.
    pub fn with_profile(profile_name: impl Into<String>) -> Self {
        Self {
            profile_name: profile_name.into(),
            credentials_file: None,
        }
    }

    /// Read from an explicit file instead of the default location.
    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    fn credentials_file_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.credentials_file {
            return Some(path.clone());
        }
        if let Ok(path) = env::var(AWS_SHARED_CREDENTIALS_FILE) {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".aws").join("credentials"))
    }

    fn parse(content: &str) -> Profiles {
        let mut profiles = Profiles::new();
        let mut current: Option<String> = None;

        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let section = section.trim();
                let name = section.strip_prefix("profile ").unwrap_or(section).trim();
                profiles.entry(name.to_string()).or_default();
                current = Some(name.to_string());
                continue;
            }

            if let (Some(profile), Some((key, value))) = (&current, line.split_once('=')) {
                profiles
                    .entry(profile.clone())
                    .or_default()
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        profiles
    }

    fn profile_error(message: String) -> AwsHttpError {
        CredentialsError::ProfileError { message }.into()
    }
}

impl Default for ProfileCredentialsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialsProvider for ProfileCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, AwsHttpError> {
        let path = self
            .credentials_file_path()
            .ok_or_else(|| Self::profile_error("cannot locate home directory".to_string()))?;

        let content = fs::read_to_string(&path).map_err(|e| {
            Self::profile_error(format!("failed to read {}: {}", path.display(), e))
        })?;

        let profiles = Self::parse(&content);
        let profile = profiles.get(&self.profile_name).ok_or_else(|| {
            Self::profile_error(format!("profile '{}' not found", self.profile_name))
        })?;

        let field = |key: &str| {
            profile.get(key).ok_or_else(|| {
                Self::profile_error(format!(
                    "{} missing from profile '{}'",
                    key, self.profile_name
                ))
            })
        };

        let credentials = AwsCredentials::new(
            field("aws_access_key_id")?.as_str(),
            field("aws_secret_access_key")?.as_str(),
        );

        Ok(match profile.get("aws_session_token") {
            Some(token) => credentials.with_session_token(token.as_str()),
            None => credentials,
        })
    }

    fn name(&self) -> &'static str {
        "profile"
    }
}
