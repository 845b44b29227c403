//! Mock implementations for testing.
//!
//! Test doubles for the three collaborator seams of
//! [`AwsHttp`](crate::AwsHttp): transport, signer and credentials provider.

mod credentials;
mod signer;
mod transport;

pub use credentials::MockCredentialsProvider;
pub use signer::{MockSigner, MOCK_SIGNATURE_HEADER};
pub use transport::{MockFailure, MockResponse, MockTransport};
