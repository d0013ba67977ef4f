//! Unconditional scheme pinning: https everywhere, http for excluded hosts.

use async_trait::async_trait;
use log::info;

use crate::error_handling::SendError;
use crate::exclusions::HttpsExclusions;
use crate::models::{Request, Response};
use crate::transport::Transport;

use super::redirect_for;

/// Pins every URL to https, and excluded URLs to http, on every call.
///
/// - `https://` URL with an excluded tail: synthesize a downgrade redirect.
/// - `http://` URL with a non-excluded tail: synthesize an upgrade redirect.
/// - Anything else (excluded http, non-excluded https, other schemes):
///   forward to the inner transport unchanged.
pub struct ForceHttpsAdapter<T> {
    exclusions: HttpsExclusions,
    inner: T,
}

impl<T> ForceHttpsAdapter<T> {
    /// Wraps `inner` with the given exclusion list.
    pub fn new(inner: T, exclusions: HttpsExclusions) -> Self {
        ForceHttpsAdapter { exclusions, inner }
    }

    /// The wrapped transport, for fallback layers that must bypass the
    /// forcing logic when re-sending over http.
    pub(crate) fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for ForceHttpsAdapter<T> {
    async fn send(&self, request: &mut Request) -> Result<Response, SendError> {
        if let Some(tail) = request.url.strip_prefix("https://") {
            if self.exclusions.is_excluded(tail) {
                let target = format!("http://{tail}");
                info!("downgraded {} to http", request.url);
                return Ok(redirect_for(request, &target));
            }
        } else if let Some(tail) = request.url.strip_prefix("http://") {
            if !self.exclusions.is_excluded(tail) {
                let target = format!("https://{tail}");
                info!("upgrading {} to https", request.url);
                return Ok(redirect_for(request, &target));
            }
        }

        self.inner.send(request).await
    }
}
