//! Endpoint resolution.
//!
//! Maps a service name and region to a fully qualified origin, or hands an
//! explicit override URI to the permissive parser in [`uri`].

mod uri;

pub use uri::parse_endpoint_uri;

use crate::error::EndpointError;
use std::fmt;
use tracing::debug;

/// Region that has no regional endpoint of its own.
pub const GLOBAL_REGION: &str = "aws-global";

/// Region used to build hostnames for [`GLOBAL_REGION`].
pub const GLOBAL_FALLBACK_REGION: &str = "us-east-1";

/// Domain suffix for every region without a dedicated partition.
pub const DEFAULT_DOMAIN: &str = "amazonaws.com";

/// Regions whose endpoints live under a partition-specific domain.
///
/// Matched by full string equality only.
const PARTITION_DOMAINS: &[(&str, &str)] = &[
    ("us-iso-east-1", "c2s.ic.gov"),
    ("us-isob-east-1", "sc2s.sgov.gov"),
    ("cn-north-1", "amazonaws.com.cn"),
    ("cn-northwest-1", "amazonaws.com.cn"),
];

/// A fully qualified network origin for a service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    uri: String,
    host: String,
    scheme: String,
    port: u16,
}

impl Endpoint {
    /// The origin as `scheme://host[:port]`, or the override string verbatim.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The host portion of the origin.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The URI scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Look up the partition domain suffix for a region.
pub fn partition_domain(region: &str) -> &'static str {
    PARTITION_DOMAINS
        .iter()
        .find(|(name, _)| *name == region)
        .map(|(_, domain)| *domain)
        .unwrap_or(DEFAULT_DOMAIN)
}

/// Resolves service endpoints.
///
/// When an override is configured it replaces the computed origin for every
/// call and the service, region and dual-stack inputs are ignored.
#[derive(Debug, Clone, Default)]
pub struct EndpointResolver {
    endpoint_override: Option<String>,
}

impl EndpointResolver {
    /// Create a resolver with an optional override URI.
    pub fn new(endpoint_override: Option<String>) -> Self {
        Self { endpoint_override }
    }

    /// The configured override URI, if any.
    pub fn endpoint_override(&self) -> Option<&str> {
        self.endpoint_override.as_deref()
    }

    /// Resolve the endpoint for `service` in `region`.
    pub fn resolve(
        &self,
        service: &str,
        region: &str,
        dualstack: bool,
    ) -> Result<Endpoint, EndpointError> {
        if let Some(endpoint_override) = &self.endpoint_override {
            let endpoint = parse_endpoint_uri(endpoint_override)?;
            debug!(
                uri = %endpoint.uri,
                host = %endpoint.host,
                port = endpoint.port,
                "Resolved endpoint from override"
            );
            return Ok(endpoint);
        }

        let endpoint = regional_endpoint(service, region, dualstack);
        debug!(
            service,
            region,
            dualstack,
            uri = %endpoint.uri,
            "Resolved regional endpoint"
        );
        Ok(endpoint)
    }
}

/// Build `https://{service}[.dualstack].{region}.{domain}`.
fn regional_endpoint(service: &str, region: &str, dualstack: bool) -> Endpoint {
    let host_region = if region == GLOBAL_REGION {
        GLOBAL_FALLBACK_REGION
    } else {
        region
    };
    let dualstack_segment = if dualstack { ".dualstack" } else { "" };
    let domain = partition_domain(region);

    let host = format!("{}{}.{}.{}", service, dualstack_segment, host_region, domain);
    Endpoint {
        uri: format!("https://{}", host),
        host,
        scheme: "https".to_string(),
        port: 443,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commercial_region() {
        let resolver = EndpointResolver::default();
        let endpoint = resolver.resolve("sts", "us-west-2", false).unwrap();
        assert_eq!(endpoint.uri(), "https://sts.us-west-2.amazonaws.com");
        assert_eq!(endpoint.host(), "sts.us-west-2.amazonaws.com");
        assert_eq!(endpoint.scheme(), "https");
        assert_eq!(endpoint.port(), 443);
    }

    #[test]
    fn test_dualstack_segment() {
        let resolver = EndpointResolver::default();
        let endpoint = resolver.resolve("s3", "eu-west-1", true).unwrap();
        assert_eq!(endpoint.uri(), "https://s3.dualstack.eu-west-1.amazonaws.com");
    }

    #[test]
    fn test_global_region_uses_us_east_1() {
        let resolver = EndpointResolver::default();
        let endpoint = resolver.resolve("iam", "aws-global", false).unwrap();
        assert_eq!(endpoint.uri(), "https://iam.us-east-1.amazonaws.com");
    }

    #[test]
    fn test_partition_lookup_is_exact() {
        assert_eq!(partition_domain("us-iso-east-1"), "c2s.ic.gov");
        assert_eq!(partition_domain("us-iso-east-12"), DEFAULT_DOMAIN);
        assert_eq!(partition_domain("cn-north"), DEFAULT_DOMAIN);
        assert_eq!(partition_domain("CN-NORTH-1"), DEFAULT_DOMAIN);
    }

    #[test]
    fn test_override_ignores_inputs() {
        let resolver = EndpointResolver::new(Some("http://localhost:4566".to_string()));
        let a = resolver.resolve("sts", "us-west-2", false).unwrap();
        let b = resolver.resolve("s3", "cn-north-1", true).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.host(), "localhost");
        assert_eq!(a.port(), 4566);
        assert_eq!(a.scheme(), "http");
    }

    #[test]
    fn test_override_parse_error() {
        let resolver = EndpointResolver::new(Some("http://localhost:port".to_string()));
        assert!(resolver.resolve("sts", "us-east-1", false).is_err());
    }

    #[test]
    fn test_display_is_uri() {
        let resolver = EndpointResolver::default();
        let endpoint = resolver.resolve("sqs", "ap-south-1", false).unwrap();
        assert_eq!(endpoint.to_string(), "https://sqs.ap-south-1.amazonaws.com");
    }
}
