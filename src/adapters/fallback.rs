//! Failure-driven https→http fallback adapters.
//!
//! Both adapters force https first and watch the send for the categorized
//! failures that mean "this host cannot do https right now": connection
//! failure, exhausted retries, TLS failure. On those, the request URL is
//! rewritten in place to http and re-sent on the bare transport, bypassing
//! the forcing layer so it cannot immediately rewrite the URL back.

use async_trait::async_trait;
use log::{debug, info};

use crate::error_handling::SendError;
use crate::exclusions::HttpsExclusions;
use crate::models::{Request, Response};
use crate::transport::Transport;

use super::ForceHttpsAdapter;

/// Forces https, falling back to plain http when the https send fails with
/// a downgrade-trigger category.
pub struct UpgradeHttpsAdapter<T> {
    force: ForceHttpsAdapter<T>,
}

impl<T> UpgradeHttpsAdapter<T> {
    /// Wraps `inner` with the given exclusion list.
    pub fn new(inner: T, exclusions: HttpsExclusions) -> Self {
        UpgradeHttpsAdapter {
            force: ForceHttpsAdapter::new(inner, exclusions),
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for UpgradeHttpsAdapter<T> {
    async fn send(&self, request: &mut Request) -> Result<Response, SendError> {
        let url = request.url.clone();

        // Non-https requests carry no failure boundary; the force layer
        // answers them (usually with a synthetic upgrade redirect).
        let Some(tail) = url.strip_prefix("https://") else {
            let response = self.force.send(request).await?;
            debug!("http response reason: {}", response.reason);
            return Ok(response);
        };

        match self.force.send(request).await {
            Ok(response) => Ok(response),
            Err(e) if e.triggers_downgrade() => {
                info!("downgrading {url} to http due to {e}");
                request.url = format!("http://{tail}");
                request.fell_back = true;
                // Bypass the force layer so the downgrade sticks.
                self.force.inner().send(request).await
            }
            Err(e) => Err(e),
        }
    }
}

/// Like [`UpgradeHttpsAdapter`], with loop prevention for the sequence
/// synthetic-redirect → re-send → failure.
///
/// A plain-http request whose first (forced) response is synthetic has its
/// URL advanced to the synthesized `Location` and sent once more, instead of
/// the caller bouncing it back in and rewriting forever. A successful https
/// send whose `Location` points back at the original URL is treated as a
/// failure trigger too: the server is refusing the upgrade with a
/// self-redirect.
pub struct SafeUpgradeHttpsAdapter<T> {
    force: ForceHttpsAdapter<T>,
}

impl<T> SafeUpgradeHttpsAdapter<T> {
    /// Wraps `inner` with the given exclusion list.
    pub fn new(inner: T, exclusions: HttpsExclusions) -> Self {
        SafeUpgradeHttpsAdapter {
            force: ForceHttpsAdapter::new(inner, exclusions),
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for SafeUpgradeHttpsAdapter<T> {
    async fn send(&self, request: &mut Request) -> Result<Response, SendError> {
        let original = request.url.clone();

        if !original.starts_with("https://") {
            let response = self.force.send(request).await?;
            debug!("http response reason: {}", response.reason);
            if !response.is_synthetic() {
                return Ok(response);
            }
            // Follow our own rewrite once instead of handing the loop to
            // the caller.
            match response.location() {
                Some(location) => request.url = location.to_string(),
                None => return Ok(response),
            }
        }

        match self.force.send(request).await {
            Ok(response) => {
                match response.location() {
                    // A Location equal to the pre-mutation URL is the server
                    // bouncing the upgrade straight back: fall back.
                    Some(location) if location == original => {
                        info!("{original} redirected back to itself, falling back to http");
                    }
                    _ => return Ok(response),
                }
            }
            Err(e) if e.triggers_downgrade() => {
                info!("downgrading {} to http due to {e}", request.url);
            }
            Err(e) => return Err(e),
        }

        if let Some(tail) = request.url.strip_prefix("https://").map(str::to_string) {
            request.url = format!("http://{tail}");
        }
        request.fell_back = true;
        // Bypass the force layer so the downgrade sticks.
        self.force.inner().send(request).await
    }
}
