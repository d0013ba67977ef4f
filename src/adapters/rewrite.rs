//! Rule- and preload-driven rewrite policies, composed first-match-wins.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use url::Url;

use crate::error_handling::SendError;
use crate::models::{Request, Response};
use crate::preload::PreloadDomains;
use crate::rules::RuleSet;
use crate::transport::Transport;

use super::redirect_for;

/// One independent rewrite decision: given a request URL, produce the
/// rewritten URL or decline.
///
/// Policies are pure lookups over immutable snapshots; they never touch the
/// network.
pub trait RewritePolicy: Send + Sync {
    /// Returns the rewritten URL, or `None` to decline.
    fn rewrite(&self, url: &str) -> Option<String>;
}

/// Rewrites http URLs whose host has a matching rule in the ruleset.
pub struct RulesetRewrite {
    rules: Arc<RuleSet>,
}

impl RulesetRewrite {
    /// Wraps a loaded ruleset snapshot.
    pub fn new(rules: Arc<RuleSet>) -> Self {
        RulesetRewrite { rules }
    }
}

impl RewritePolicy for RulesetRewrite {
    fn rewrite(&self, url: &str) -> Option<String> {
        // RuleSet::rewrite already enforces the http-only / https-output
        // contract.
        self.rules.rewrite(url)
    }
}

/// Rewrites http URLs whose host (or a parent domain) is preloaded.
pub struct PreloadRewrite {
    domains: Arc<PreloadDomains>,
}

impl PreloadRewrite {
    /// Wraps a loaded preload snapshot.
    pub fn new(domains: Arc<PreloadDomains>) -> Self {
        PreloadRewrite { domains }
    }
}

impl RewritePolicy for PreloadRewrite {
    fn rewrite(&self, url: &str) -> Option<String> {
        if !url.starts_with("http://") {
            return None;
        }
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        if !self.domains.contains(host) {
            return None;
        }
        // Swap the scheme, keep the rest of the URL verbatim.
        Some(format!("https:{}", &url["http:".len()..]))
    }
}

/// Applies an ordered list of rewrite policies to each request,
/// short-circuiting into a synthetic redirect on the first match.
///
/// This is policy composition, not request mutation: a later policy only
/// runs when every earlier one declined.
pub struct RewriteAdapter<T> {
    policies: Vec<Box<dyn RewritePolicy>>,
    inner: T,
}

impl<T> RewriteAdapter<T> {
    /// Composes an explicit policy list, evaluated in order.
    pub fn from_policies(policies: Vec<Box<dyn RewritePolicy>>, inner: T) -> Self {
        RewriteAdapter { policies, inner }
    }

    /// Ruleset-only rewriting.
    pub fn with_rules(rules: Arc<RuleSet>, inner: T) -> Self {
        Self::from_policies(vec![Box::new(RulesetRewrite::new(rules))], inner)
    }

    /// Preload-list-only rewriting.
    pub fn with_preload(domains: Arc<PreloadDomains>, inner: T) -> Self {
        Self::from_policies(vec![Box::new(PreloadRewrite::new(domains))], inner)
    }

    /// Preload list consulted first, then the ruleset.
    pub fn combined(domains: Arc<PreloadDomains>, rules: Arc<RuleSet>, inner: T) -> Self {
        Self::from_policies(
            vec![
                Box::new(PreloadRewrite::new(domains)),
                Box::new(RulesetRewrite::new(rules)),
            ],
            inner,
        )
    }
}

#[async_trait]
impl<T: Transport> Transport for RewriteAdapter<T> {
    async fn send(&self, request: &mut Request) -> Result<Response, SendError> {
        for policy in &self.policies {
            if let Some(target) = policy.rewrite(&request.url) {
                info!("rewriting {} to {}", request.url, target);
                return Ok(redirect_for(request, &target));
            }
        }
        debug!("no rewrite for {}", request.url);
        self.inner.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RewriteRule;

    #[test]
    fn test_preload_policy_swaps_scheme_verbatim() {
        let policy = PreloadRewrite::new(Arc::new(PreloadDomains::from_domains(["example.com"])));
        assert_eq!(
            policy.rewrite("http://www.example.com/a?b=c"),
            Some("https://www.example.com/a?b=c".to_string())
        );
    }

    #[test]
    fn test_preload_policy_declines_https_and_other_schemes() {
        let policy = PreloadRewrite::new(Arc::new(PreloadDomains::from_domains(["example.com"])));
        assert_eq!(policy.rewrite("https://example.com/"), None);
        assert_eq!(policy.rewrite("ftp://example.com/"), None);
        assert_eq!(policy.rewrite("not a url"), None);
    }

    #[test]
    fn test_preload_policy_declines_unlisted_host() {
        let policy = PreloadRewrite::new(Arc::new(PreloadDomains::from_domains(["example.com"])));
        assert_eq!(policy.rewrite("http://other.com/"), None);
    }

    #[test]
    fn test_ruleset_policy_delegates_to_rules() {
        let mut rules = RuleSet::new();
        rules.insert(
            "example.org",
            RewriteRule::new("^http://example\\.org/", "https://example.org/").unwrap(),
        );
        let policy = RulesetRewrite::new(Arc::new(rules));
        assert_eq!(
            policy.rewrite("http://example.org/x"),
            Some("https://example.org/x".to_string())
        );
        assert_eq!(policy.rewrite("http://other.org/x"), None);
    }
}
