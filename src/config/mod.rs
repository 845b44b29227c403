//! Client and per-call configuration.

use crate::endpoint::GLOBAL_REGION;
use crate::error::{AwsHttpError, ConfigurationError};
use crate::headers::DEFAULT_USER_AGENT;
use crate::transport::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
use std::time::Duration;

/// Variable naming an endpoint that replaces every resolved endpoint.
pub const AWS_ENDPOINT_URL: &str = "AWS_ENDPOINT_URL";

/// Configuration for [`AwsHttp`](crate::AwsHttp).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Endpoint URI used for every call instead of the resolved one.
    pub endpoint_override: Option<String>,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Timeout for a whole request: connect, send, response headers and body.
    pub request_timeout: Duration,

    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint_override: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    endpoint_override: Option<String>,
    connect_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ClientConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Send every call to this endpoint URI.
    pub fn endpoint_override(mut self, uri: impl Into<String>) -> Self {
        self.endpoint_override = Some(uri.into());
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the timeout for a whole request, from connect to the last body byte.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the `User-Agent` header value.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Load settings from environment variables.
    ///
    /// Reads `AWS_ENDPOINT_URL`; an empty value counts as unset. The URI is
    /// parsed on first use, not here.
    pub fn from_env(mut self) -> Self {
        if let Ok(uri) = std::env::var(AWS_ENDPOINT_URL) {
            if !uri.is_empty() {
                self.endpoint_override = Some(uri);
            }
        }
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<ClientConfig, AwsHttpError> {
        let defaults = ClientConfig::default();

        let connect_timeout = self.connect_timeout.unwrap_or(defaults.connect_timeout);
        if connect_timeout.is_zero() {
            return Err(invalid("connect_timeout", "Timeout must be greater than zero"));
        }

        let request_timeout = self.request_timeout.unwrap_or(defaults.request_timeout);
        if request_timeout.is_zero() {
            return Err(invalid("request_timeout", "Timeout must be greater than zero"));
        }

        let user_agent = self.user_agent.unwrap_or(defaults.user_agent);
        if user_agent.trim().is_empty() {
            return Err(invalid("user_agent", "User agent must not be empty"));
        }

        Ok(ClientConfig {
            endpoint_override: self.endpoint_override,
            connect_timeout,
            request_timeout,
            user_agent,
        })
    }
}

fn invalid(field: &str, message: &str) -> AwsHttpError {
    ConfigurationError::InvalidConfiguration {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// Per-call options for [`AwsHttp::call_api`](crate::AwsHttp::call_api).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Region. `aws-global` resolves to `us-east-1` hosts but is signed as is.
    pub region: String,
    /// Use the dual-stack host name.
    pub dualstack: bool,
    /// Signing service name when it differs from the endpoint service.
    pub sigv4_service_name: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            region: GLOBAL_REGION.to_string(),
            dualstack: false,
            sigv4_service_name: None,
        }
    }
}

impl Options {
    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Enable or disable dual-stack host names.
    pub fn with_dualstack(mut self, dualstack: bool) -> Self {
        self.dualstack = dualstack;
        self
    }

    /// Override the signing service name.
    pub fn with_sigv4_service_name(mut self, name: impl Into<String>) -> Self {
        self.sigv4_service_name = Some(name.into());
        self
    }

    /// The signing service name, falling back to `service`.
    pub fn signing_service<'a>(&'a self, service: &'a str) -> &'a str {
        self.sigv4_service_name.as_deref().unwrap_or(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let config = ClientConfig::builder().build().unwrap();
        assert!(config.endpoint_override.is_none());
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("aws-http/"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::builder()
            .endpoint_override("http://localhost:4566")
            .connect_timeout(Duration::from_secs(1))
            .request_timeout(Duration::from_secs(10))
            .user_agent("my-app/1.0")
            .build()
            .unwrap();

        assert_eq!(config.endpoint_override.as_deref(), Some("http://localhost:4566"));
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.user_agent, "my-app/1.0");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ClientConfig::builder()
            .request_timeout(Duration::ZERO)
            .build()
            .unwrap_err();

        assert!(matches!(
            err,
            AwsHttpError::Configuration(ConfigurationError::InvalidConfiguration { ref field, .. })
                if field == "request_timeout"
        ));
    }

    #[test]
    fn test_empty_user_agent_rejected() {
        assert!(ClientConfig::builder().user_agent("  ").build().is_err());
    }

    #[test]
    fn test_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();

        std::env::set_var(AWS_ENDPOINT_URL, "http://localhost:4566");
        let config = ClientConfig::builder().from_env().build().unwrap();
        assert_eq!(config.endpoint_override.as_deref(), Some("http://localhost:4566"));

        std::env::set_var(AWS_ENDPOINT_URL, "");
        let config = ClientConfig::builder().from_env().build().unwrap();
        assert!(config.endpoint_override.is_none());

        std::env::remove_var(AWS_ENDPOINT_URL);
        let config = ClientConfig::builder().from_env().build().unwrap();
        assert!(config.endpoint_override.is_none());
    }

    #[test]
    fn test_options() {
        let options = Options::default();
        assert_eq!(options.region, "aws-global");
        assert!(!options.dualstack);
        assert_eq!(options.signing_service("sts"), "sts");

        let options = Options::default()
            .with_region("eu-west-1")
            .with_dualstack(true)
            .with_sigv4_service_name("execute-api");
        assert_eq!(options.region, "eu-west-1");
        assert!(options.dualstack);
        assert_eq!(options.signing_service("apigateway"), "execute-api");
    }
}
