//! Symmetric sign/release around a single request.

use super::{RequestSigner, SigningConfig};
use crate::error::AwsHttpError;
use crate::types::Request;
use std::fmt;
use std::ops::Deref;
use tracing::trace;

/// A request that may have been signed.
///
/// When the request was signed, dropping the guard hands it back to the signer
/// through [`RequestSigner::release_signed`]. Keep the guard alive until the
/// transport has finished with the request.
pub struct SignedRequest<'a> {
    request: Request,
    release: Option<(&'a dyn RequestSigner, &'a SigningConfig)>,
}

impl<'a> SignedRequest<'a> {
    /// Wrap a request that was not signed. Dropping it releases nothing.
    pub fn unsigned(request: Request) -> Self {
        Self {
            request,
            release: None,
        }
    }

    /// True if the request was signed and will be released on drop.
    pub fn is_signed(&self) -> bool {
        self.release.is_some()
    }
}

impl Deref for SignedRequest<'_> {
    type Target = Request;

    fn deref(&self) -> &Request {
        &self.request
    }
}

impl Drop for SignedRequest<'_> {
    fn drop(&mut self) {
        if let Some((signer, config)) = self.release.take() {
            trace!("Releasing signing state");
            signer.release_signed(std::mem::take(&mut self.request), config);
        }
    }
}

impl fmt::Debug for SignedRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedRequest")
            .field("request", &self.request)
            .field("signed", &self.is_signed())
            .finish()
    }
}

/// Sign `request` when a config is given.
///
/// With `None` the request passes through untouched. A signing failure is
/// returned as is and nothing is released.
pub async fn sign_request<'a>(
    signer: &'a dyn RequestSigner,
    request: Request,
    config: Option<&'a SigningConfig>,
) -> Result<SignedRequest<'a>, AwsHttpError> {
    let Some(config) = config else {
        return Ok(SignedRequest::unsigned(request));
    };

    let signed = signer.sign(request, config).await?;
    Ok(SignedRequest {
        request: signed,
        release: Some((signer, config)),
    })
}
