//! Low-level AWS HTTP transport.
//!
//! Turns a logical request (method, path, query, body, headers) into an
//! addressed and optionally SigV4-signed HTTP exchange and returns the raw
//! response. Works against AWS services and as a plain HTTPS client.
//!
//! # Features
//!
//! - **Endpoint resolution**: partition domains, dual-stack host names, the
//!   `aws-global` region and an `AWS_ENDPOINT_URL` override
//! - **Header assembly**: a fixed, deterministic header set per request
//! - **Signing**: AWS Signature V4, header or query-parameter placement
//! - **Credentials**: static, environment, shared profile file and a caching chain
//! - **Transport**: `reqwest` with rustls and either the bundled roots or a
//!   caller-supplied PEM trust anchor
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use aws_http::{AwsHttp, Options, Request};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), aws_http::AwsHttpError> {
//!     let client = AwsHttp::with_bundled_roots()?;
//!
//!     let request = Request::default()
//!         .with_content_type("application/x-www-form-urlencoded")
//!         .with_body("Action=GetCallerIdentity&Version=2011-06-15");
//!
//!     let result = client
//!         .call_api("sts", &request, &Options::default().with_region("us-west-2"))
//!         .await?;
//!
//!     println!("{} {:?}", result.response_code, result.body_str());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod headers;
pub mod mocks;
pub mod signing;
pub mod tls;
pub mod transport;
pub mod types;

// Re-export main types at crate root
pub use client::{AwsHttp, AwsHttpBuilder};
pub use config::{ClientConfig, ClientConfigBuilder, Options};
pub use credentials::{
    AwsCredentials, ChainCredentialsProvider, CredentialsProvider, EnvCredentialsProvider,
    ProfileCredentialsProvider, StaticCredentialsProvider,
};
pub use endpoint::{parse_endpoint_uri, partition_domain, Endpoint, EndpointResolver};
pub use error::{
    AwsHttpError, ConfigurationError, CredentialsError, EndpointError, ErrorPhase, NetworkError,
    ResponseError, SigningError, TlsError,
};
pub use headers::{build_headers, HeaderBuilder};
pub use signing::{RequestSigner, SigV4Signer, SignatureType, SigningConfig};
pub use tls::TrustAnchor;
pub use transport::{Connection, HttpRequest, HttpTransport, ReqwestTransport, StatusLine};
pub use types::{Header, HttpResult, Request};

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, AwsHttpError>;

/// Create a client from environment configuration that trusts the bundled
/// root certificates.
pub fn create_client_from_env() -> Result<AwsHttp> {
    AwsHttp::with_bundled_roots()
}
