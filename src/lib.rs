//! https_upgrade library: scheme-rewriting adapters for outgoing HTTP
//! requests.
//!
//! Requests sent through an adapter chain have their target scheme rewritten
//! before anything touches the network: upgraded to https when rules, preload
//! lists, or live probing say it is safe, downgraded to http when an upgrade
//! is known to fail. Rewrites surface as synthetic 302 responses whose
//! `Location` header carries the new target, so callers see the decision
//! without an extra round trip.
//!
//! # Example
//!
//! ```no_run
//! use https_upgrade::{ForceHttpsAdapter, HttpTransport, HttpsExclusions, Request, Transport};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = reqwest::Client::builder()
//!     .redirect(reqwest::redirect::Policy::none())
//!     .build()?;
//! let adapter = ForceHttpsAdapter::new(HttpTransport::new(client), HttpsExclusions::default());
//!
//! let mut request = Request::get("http://example.com/");
//! let response = adapter.send(&mut request).await?;
//! assert!(response.is_synthetic());
//! assert_eq!(response.location(), Some("https://example.com/"));
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

#![warn(missing_docs)]

mod adapters;
pub mod config;
mod error_handling;
mod exclusions;
pub mod initialization;
mod models;
mod preload;
mod rules;
mod transport;

// Re-export public API
pub use adapters::{
    ForceHttpsAdapter, PreferHttpsAdapter, PreloadRewrite, RewriteAdapter, RewritePolicy,
    RulesetRewrite, SafeUpgradeHttpsAdapter, UpgradeHttpsAdapter,
};
pub use error_handling::{
    ConfigError, DecisionStats, DecisionType, InitializationError, SendError,
};
pub use exclusions::HttpsExclusions;
pub use models::{Request, Response, REDIRECT_REASON};
pub use preload::PreloadDomains;
pub use rules::{RewriteRule, RuleSet};
pub use run::{run_check, CheckReport};
pub use transport::{HttpTransport, Transport};

// Internal run module (contains the CLI checking logic)
mod run {
    use std::sync::Arc;

    use anyhow::{bail, Context, Result};
    use log::{info, warn};
    use strum::IntoEnumIterator;
    use tokio::io::{AsyncBufReadExt, BufReader};

    use crate::adapters::{
        ForceHttpsAdapter, PreferHttpsAdapter, RewriteAdapter, SafeUpgradeHttpsAdapter,
        UpgradeHttpsAdapter,
    };
    use crate::config::{Mode, Opt};
    use crate::error_handling::{DecisionStats, DecisionType};
    use crate::exclusions::HttpsExclusions;
    use crate::initialization::init_transport;
    use crate::models::{Request, Response};
    use crate::preload::PreloadDomains;
    use crate::rules::RuleSet;
    use crate::transport::Transport;

    /// Results of a URL checking run.
    ///
    /// Contains per-decision counts for the completed run.
    #[derive(Debug, Clone)]
    pub struct CheckReport {
        /// Total number of URLs checked
        pub total: usize,
        /// URLs upgraded to https: answered with a synthetic upgrade
        /// redirect, or transparently re-sent over https by safe-upgrade
        pub upgraded: usize,
        /// URLs answered with a synthetic http downgrade redirect
        pub downgraded: usize,
        /// URLs rewritten by the ruleset or preload list
        pub rewritten: usize,
        /// URLs whose https send failed and was re-sent over http
        pub fell_back: usize,
        /// URLs passed through to the transport unchanged
        pub passed: usize,
        /// URLs whose send failed
        pub failed: usize,
    }

    /// Runs a URL check with the provided options.
    ///
    /// Builds the adapter chain selected by `--mode`, sends every URL through
    /// it sequentially, logs each decision, and prints a decision summary.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - No URLs were provided (neither a file nor `--url`)
    /// - The input file cannot be opened
    /// - The transport cannot be initialized
    /// - A `--rules` or `--preload` source fails to load
    pub async fn run_check(opt: Opt) -> Result<CheckReport> {
        let urls = collect_urls(&opt).await?;
        if urls.is_empty() {
            bail!("no URLs to check; pass a file or --url");
        }

        let transport = init_transport(&opt).context("Failed to initialize HTTP transport")?;
        let exclusions = HttpsExclusions::new(opt.exclusions.clone());

        let chain: Box<dyn Transport> = match opt.mode {
            Mode::Force => Box::new(ForceHttpsAdapter::new(transport, exclusions)),
            Mode::Prefer => Box::new(PreferHttpsAdapter::new(transport, exclusions)),
            Mode::Upgrade => Box::new(UpgradeHttpsAdapter::new(transport, exclusions)),
            Mode::SafeUpgrade => Box::new(SafeUpgradeHttpsAdapter::new(transport, exclusions)),
            Mode::Rewrite => {
                let rules = match &opt.rules {
                    Some(path) => RuleSet::load(path)
                        .await
                        .context("Failed to load ruleset")?,
                    None => RuleSet::new(),
                };
                let preload = match &opt.preload {
                    Some(path) => PreloadDomains::load(path)
                        .await
                        .context("Failed to load preload domains")?,
                    None => PreloadDomains::default(),
                };
                if rules.host_count() == 0 && preload.is_empty() {
                    warn!("rewrite mode without --rules or --preload never rewrites anything");
                }
                Box::new(RewriteAdapter::combined(
                    Arc::new(preload),
                    Arc::new(rules),
                    transport,
                ))
            }
        };

        let stats = DecisionStats::new();

        for url in &urls {
            let mut request = Request::get(url);
            match chain.send(&mut request).await {
                Ok(response) => {
                    if response.is_synthetic() {
                        let location = response.location().unwrap_or_default();
                        info!("{url} -> {location} ({})", response.status);
                    } else {
                        info!("{url} answered {} {}", response.status, response.reason);
                    }
                    stats.increment(classify_decision(opt.mode, url, &request, &response));
                }
                Err(e) => {
                    warn!("{url} failed: {e}");
                    stats.increment(DecisionType::Failed);
                }
            }
        }

        print_decision_statistics(&stats);

        Ok(CheckReport {
            total: urls.len(),
            upgraded: stats.get_count(DecisionType::Upgraded),
            downgraded: stats.get_count(DecisionType::Downgraded),
            rewritten: stats.get_count(DecisionType::Rewritten),
            fell_back: stats.get_count(DecisionType::FellBack),
            passed: stats.get_count(DecisionType::Passed),
            failed: stats.get_count(DecisionType::Failed),
        })
    }

    /// Gathers URLs from `--url` flags and the input file (or stdin when the
    /// file argument is `-`). Blank lines and `#` comments are skipped.
    async fn collect_urls(opt: &Opt) -> Result<Vec<String>> {
        let mut urls = opt.urls.clone();

        let Some(path) = &opt.file else {
            return Ok(urls);
        };

        if path.as_os_str() == "-" {
            info!("Reading URLs from stdin");
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                push_url_line(&mut urls, &line);
            }
        } else {
            let file = tokio::fs::File::open(path)
                .await
                .context("Failed to open input file")?;
            let mut lines = BufReader::new(file).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                push_url_line(&mut urls, &line);
            }
        }

        Ok(urls)
    }

    /// Maps one completed send onto a decision counter.
    ///
    /// Synthetic responses are classified by their rewrite target. Real
    /// responses are classified by what happened to the request: the
    /// fallback adapters tag the request when they re-send over http, and
    /// safe-upgrade leaves the URL at the https target after a transparent
    /// upgrade. URL mutation alone is ambiguous: a safe-upgrade fallback
    /// ends with the URL back at the original.
    fn classify_decision(
        mode: Mode,
        original: &str,
        request: &Request,
        response: &Response,
    ) -> DecisionType {
        if response.is_synthetic() {
            if mode == Mode::Rewrite {
                return DecisionType::Rewritten;
            }
            let location = response.location().unwrap_or_default();
            if location.starts_with("https://") {
                DecisionType::Upgraded
            } else {
                DecisionType::Downgraded
            }
        } else if request.fell_back {
            DecisionType::FellBack
        } else if request.url != original && request.url.starts_with("https://") {
            DecisionType::Upgraded
        } else {
            DecisionType::Passed
        }
    }

    fn push_url_line(urls: &mut Vec<String>, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return;
        }
        urls.push(trimmed.to_string());
    }

    /// Prints decision counts to the log, non-zero counters only.
    fn print_decision_statistics(stats: &DecisionStats) {
        let total = stats.total();
        if total == 0 {
            return;
        }
        info!("Decision Counts ({} total):", total);
        for decision in DecisionType::iter() {
            let count = stats.get_count(decision);
            if count > 0 {
                info!("   {}: {}", decision.as_str(), count);
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::{classify_decision, push_url_line};
        use crate::config::Mode;
        use crate::error_handling::DecisionType;
        use crate::models::{Request, Response};

        fn real_response(url: &str, status: u16) -> Response {
            Response {
                status,
                reason: "OK".to_string(),
                headers: reqwest::header::HeaderMap::new(),
                url: url.to_string(),
                body: String::new(),
                encoding: "utf-8",
                synthetic: false,
            }
        }

        #[test]
        fn test_push_url_line_skips_comments_and_blanks() {
            let mut urls = Vec::new();
            push_url_line(&mut urls, "# comment");
            push_url_line(&mut urls, "   ");
            push_url_line(&mut urls, "");
            push_url_line(&mut urls, "  http://example.com/  ");
            assert_eq!(urls, vec!["http://example.com/".to_string()]);
        }

        #[test]
        fn test_tagged_fallback_counts_as_fell_back() {
            // A safe-upgrade fallback ends with the URL back at the
            // original; only the tag distinguishes it from a pass-through.
            let mut request = Request::get("http://x.com/");
            request.fell_back = true;
            let response = real_response("http://x.com/", 200);
            assert_eq!(
                classify_decision(Mode::SafeUpgrade, "http://x.com/", &request, &response),
                DecisionType::FellBack
            );
        }

        #[test]
        fn test_transparent_https_send_counts_as_upgraded() {
            let mut request = Request::get("http://x.com/");
            request.url = "https://x.com/".to_string();
            let response = real_response("https://x.com/", 200);
            assert_eq!(
                classify_decision(Mode::SafeUpgrade, "http://x.com/", &request, &response),
                DecisionType::Upgraded
            );
        }

        #[test]
        fn test_unchanged_request_counts_as_passed() {
            let request = Request::get("http://x.com/");
            let response = real_response("http://x.com/", 200);
            assert_eq!(
                classify_decision(Mode::Force, "http://x.com/", &request, &response),
                DecisionType::Passed
            );
        }

        #[test]
        fn test_synthetic_https_location_counts_as_upgraded() {
            let request = Request::get("http://x.com/");
            let response = Response::redirect("https://x.com/", 302);
            assert_eq!(
                classify_decision(Mode::Force, "http://x.com/", &request, &response),
                DecisionType::Upgraded
            );
        }

        #[test]
        fn test_synthetic_http_location_counts_as_downgraded() {
            let request = Request::get("https://x.com/api");
            let response = Response::redirect("http://x.com/api", 302);
            assert_eq!(
                classify_decision(Mode::Force, "https://x.com/api", &request, &response),
                DecisionType::Downgraded
            );
        }

        #[test]
        fn test_synthetic_counts_as_rewritten_in_rewrite_mode() {
            let request = Request::get("http://x.com/");
            let response = Response::redirect("https://x.com/", 302);
            assert_eq!(
                classify_decision(Mode::Rewrite, "http://x.com/", &request, &response),
                DecisionType::Rewritten
            );
        }
    }
}
