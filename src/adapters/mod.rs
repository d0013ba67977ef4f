//! Scheme-rewriting adapters.
//!
//! Each adapter wraps a [`Transport`](crate::transport::Transport) and
//! implements `Transport` itself, so chains compose by nesting. A request
//! either short-circuits into a synthesized redirect response or is
//! forwarded to the layer below; the fallback adapters additionally re-route
//! a failed https send back over http.

mod fallback;
mod force;
mod probe;
mod rewrite;

pub use fallback::{SafeUpgradeHttpsAdapter, UpgradeHttpsAdapter};
pub use force::ForceHttpsAdapter;
pub use probe::PreferHttpsAdapter;
pub use rewrite::{PreloadRewrite, RewriteAdapter, RewritePolicy, RulesetRewrite};

use crate::config::REDIRECT_STATUS;
use crate::models::{Request, Response};

/// Synthesizes a 302 redirect answering `request`, pointing at `location`.
///
/// The response `url` is the original request URL so that callers following
/// the "response.url reflects what was requested" convention are not
/// confused; the rewrite target lives only in the `Location` header.
pub(crate) fn redirect_for(request: &Request, location: &str) -> Response {
    let mut response = Response::redirect(location, REDIRECT_STATUS);
    response.url = request.url.clone();
    response
}
