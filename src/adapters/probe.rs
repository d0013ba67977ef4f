//! Probe-before-upgrade adapter.
//!
//! Before forcing https on a plain-http URL, this adapter follows the
//! destination's own redirects over http (HEAD requests, no automatic
//! redirect following) to learn whether the server already redirects across
//! schemes or hosts. Servers with a broken https endpoint but a working
//! cross-host http redirect keep working this way.

use async_trait::async_trait;
use log::{debug, info};

use crate::config::MAX_PROBE_HOPS;
use crate::error_handling::SendError;
use crate::exclusions::HttpsExclusions;
use crate::models::{Request, Response};
use crate::transport::Transport;

use super::redirect_for;

/// What the redirect probe learned about a URL.
enum ProbeOutcome {
    /// The chain ended without a cross-scheme redirect; holds the last URL
    /// that answered before the terminal step, if any. The original URL is
    /// considered safe to upgrade.
    LastGood(Option<String>),
    /// The server redirects to an https URL whose tail is excluded; the
    /// request must be pinned to this http URL instead.
    Downgrade(String),
    /// The server itself redirects to https; its own redirect response is
    /// authoritative and stands in for the final answer.
    Authoritative(Response),
}

/// Forces https like [`ForceHttpsAdapter`](super::ForceHttpsAdapter), but
/// probes the destination over http first.
///
/// Exclusion handling is identical: excluded https URLs are downgraded
/// before any probing happens, and excluded http URLs pass through.
pub struct PreferHttpsAdapter<T> {
    exclusions: HttpsExclusions,
    inner: T,
}

impl<T> PreferHttpsAdapter<T> {
    /// Wraps `inner` with the given exclusion list.
    pub fn new(inner: T, exclusions: HttpsExclusions) -> Self {
        PreferHttpsAdapter { exclusions, inner }
    }
}

impl<T: Transport> PreferHttpsAdapter<T> {
    /// One probe step: HEAD, with a GET retry only when the server answers
    /// 403 to HEAD. Any status >= 400 counts as a failed step.
    async fn probe_once(&self, url: &str) -> Result<Response, SendError> {
        let mut head = Request::head(url);
        let response = self.inner.send(&mut head).await?;

        let response = if response.status == 403 {
            debug!("HEAD {url} answered 403, retrying with GET");
            let mut get = Request::get(url);
            self.inner.send(&mut get).await?
        } else {
            response
        };

        if response.status >= 400 {
            return Err(SendError::Other {
                url: url.to_string(),
                message: format!("probe answered status {}", response.status),
            });
        }
        Ok(response)
    }

    /// Follows the destination's http redirects, one step of memory, hard
    /// hop cap.
    ///
    /// Probe failures are never propagated; they terminate the probe with
    /// the last known-good URL. The one loud exception is a redirect to a
    /// scheme other than http/https, which is a configuration error.
    async fn follow_redirects_on_http(&self, url: &str) -> Result<ProbeOutcome, SendError> {
        let mut previous: Option<String> = None;
        let mut current = url.to_string();

        for _ in 0..MAX_PROBE_HOPS {
            let response = match self.probe_once(&current).await {
                Ok(response) => response,
                Err(e) => {
                    info!("probe of {current} failed: {e}");
                    return Ok(ProbeOutcome::LastGood(previous));
                }
            };

            let location = match response.location() {
                None => return Ok(ProbeOutcome::LastGood(previous)),
                Some(location) if location == current => {
                    return Ok(ProbeOutcome::LastGood(previous))
                }
                Some(location) => location.to_string(),
            };
            debug!("probe {current} -> {location}");

            // Only well-formed "https://" targets count as the cross-scheme
            // case; a degenerate form like "https:foo" falls through to the
            // unsupported-scheme failure instead of being sliced blindly.
            if let Some(tail) = location.strip_prefix("https://") {
                if self.exclusions.is_excluded(tail) {
                    return Ok(ProbeOutcome::Downgrade(format!("http://{tail}")));
                }
                return Ok(ProbeOutcome::Authoritative(response));
            } else if location.starts_with("http://") {
                previous = Some(current);
                current = location;
            } else {
                return Err(SendError::UnsupportedScheme {
                    url: current,
                    location,
                });
            }
        }

        debug!("probe of {url} exceeded {MAX_PROBE_HOPS} hops");
        Ok(ProbeOutcome::LastGood(previous))
    }
}

#[async_trait]
impl<T: Transport> Transport for PreferHttpsAdapter<T> {
    async fn send(&self, request: &mut Request) -> Result<Response, SendError> {
        let url = request.url.clone();

        if let Some(tail) = url.strip_prefix("https://") {
            if self.exclusions.is_excluded(tail) {
                let target = format!("http://{tail}");
                info!("downgraded {url} to http");
                return Ok(redirect_for(request, &target));
            }
        } else if let Some(tail) = url.strip_prefix("http://") {
            if !self.exclusions.is_excluded(tail) {
                debug!("checking {url} for redirects");
                match self.follow_redirects_on_http(&url).await? {
                    ProbeOutcome::Authoritative(response) => {
                        info!(
                            "upgrading {url} to https via server redirect to {}",
                            response.location().unwrap_or("<missing location>")
                        );
                        return Ok(response);
                    }
                    ProbeOutcome::Downgrade(target) => {
                        info!("downgraded {url} to {target}");
                        return Ok(redirect_for(request, &target));
                    }
                    ProbeOutcome::LastGood(_) => {
                        // The probe only confirms upgrade safety for the
                        // original URL; hosts discovered mid-chain are not
                        // redirected to.
                        let target = format!("https://{tail}");
                        info!("upgrading {url} to https");
                        return Ok(redirect_for(request, &target));
                    }
                }
            }
        }

        self.inner.send(request).await
    }
}
