//! Mock signer for testing.

use crate::error::{AwsHttpError, SigningError};
use crate::signing::{RequestSigner, SigningConfig};
use crate::types::{Header, Request};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Header the mock signer adds to every signed request.
pub const MOCK_SIGNATURE_HEADER: &str = "X-Mock-Signature";

/// Mock signer that counts sign and release calls.
pub struct MockSigner {
    fail: AtomicBool,
    sign_count: AtomicUsize,
    release_count: AtomicUsize,
    released: Mutex<Vec<Request>>,
}

impl MockSigner {
    /// Create a signer that adds a `X-Mock-Signature` header.
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            sign_count: AtomicUsize::new(0),
            release_count: AtomicUsize::new(0),
            released: Mutex::new(Vec::new()),
        }
    }

    /// Create a signer whose `sign` fails with `SigningError::Signable`.
    pub fn failing() -> Self {
        let signer = Self::new();
        signer.set_failing(true);
        signer
    }

    /// Switch failure mode on or off.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of `sign` calls.
    pub fn sign_count(&self) -> usize {
        self.sign_count.load(Ordering::SeqCst)
    }

    /// Number of `release_signed` calls.
    pub fn release_count(&self) -> usize {
        self.release_count.load(Ordering::SeqCst)
    }

    /// Requests handed back through `release_signed`, in order.
    pub fn released(&self) -> Vec<Request> {
        self.released.lock().clone()
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestSigner for MockSigner {
    async fn sign(
        &self,
        mut request: Request,
        config: &SigningConfig,
    ) -> Result<Request, AwsHttpError> {
        self.sign_count.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SigningError::Signable {
                message: "mock signing failure".to_string(),
            }
            .into());
        }

        request.headers.push(Header::new(
            MOCK_SIGNATURE_HEADER,
            format!("{}/{}", config.region, config.service),
        ));
        Ok(request)
    }

    fn release_signed(&self, request: Request, _config: &SigningConfig) {
        self.release_count.fetch_add(1, Ordering::SeqCst);
        self.released.lock().push(request);
    }
}
