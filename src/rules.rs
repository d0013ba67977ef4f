//! Host-keyed rewrite rules.
//!
//! A [`RuleSet`] maps hosts to ordered rewrite rules. It is loaded once at
//! adapter construction, is read-only afterwards, and can therefore be
//! shared across threads behind an `Arc` with no locking. Hot-reloading, if
//! a caller ever wants it, means building a fresh snapshot and swapping the
//! whole `Arc`, never mutating in place.

use std::collections::HashMap;
use std::path::Path;

use log::info;
use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::error_handling::ConfigError;

/// A single rewrite rule: a match pattern over URLs and a replacement
/// producing the rewritten URL.
#[derive(Debug)]
pub struct RewriteRule {
    from: Regex,
    to: String,
}

impl RewriteRule {
    /// Compiles a rule from a regex pattern and a replacement template.
    ///
    /// Replacement templates use regex capture-group syntax, e.g.
    /// `from = "^http://(www\\.)?example\\.org/"`, `to = "https://example.org/"`.
    pub fn new(from: &str, to: &str) -> Result<Self, ConfigError> {
        let from = Regex::new(from).map_err(|source| ConfigError::Rule {
            pattern: from.to_string(),
            source,
        })?;
        Ok(RewriteRule {
            from,
            to: to.to_string(),
        })
    }

    /// Applies the rule to `url`, returning the rewritten URL when the
    /// pattern matches.
    pub fn apply(&self, url: &str) -> Option<String> {
        if !self.from.is_match(url) {
            return None;
        }
        Some(self.from.replace(url, self.to.as_str()).into_owned())
    }
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    from: String,
    to: String,
}

/// An immutable mapping from host (and superdomain) to ordered rewrite
/// rules.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: HashMap<String, Vec<RewriteRule>>,
}

impl RuleSet {
    /// Creates an empty ruleset.
    pub fn new() -> Self {
        RuleSet::default()
    }

    /// Adds a rule for `host`. Rules for the same host keep insertion order.
    pub fn insert(&mut self, host: &str, rule: RewriteRule) {
        self.rules
            .entry(host.to_ascii_lowercase())
            .or_default()
            .push(rule);
    }

    /// Loads a ruleset from a JSON file of the shape
    /// `{ "host": [ { "from": "...", "to": "..." } ] }`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, does not parse, or
    /// contains an invalid pattern. Construction failures are loud: a
    /// missing ruleset must never silently become "never rewrite".
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;

        let entries: HashMap<String, Vec<RuleEntry>> =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        let mut ruleset = RuleSet::new();
        let mut rule_count = 0usize;
        for (host, host_entries) in entries {
            for entry in host_entries {
                ruleset.insert(&host, RewriteRule::new(&entry.from, &entry.to)?);
                rule_count += 1;
            }
        }

        info!(
            "loaded {} rewrite rule(s) for {} host(s) from {}",
            rule_count,
            ruleset.rules.len(),
            path.display()
        );
        Ok(ruleset)
    }

    /// Returns the rules applicable to `host`: exact-host rules first, then
    /// rules registered for each parent superdomain.
    pub fn lookup(&self, host: &str) -> Vec<&RewriteRule> {
        let host = host.to_ascii_lowercase();
        let mut matches = Vec::new();
        let mut candidate = host.as_str();
        loop {
            if let Some(rules) = self.rules.get(candidate) {
                matches.extend(rules.iter());
            }
            match candidate.split_once('.') {
                Some((_, rest)) if !rest.is_empty() => candidate = rest,
                _ => break,
            }
        }
        matches
    }

    /// Rewrites `url` when a rule for its host matches.
    ///
    /// Only plain `http://` URLs are considered, and only the *first*
    /// matching rule is applied; its output is accepted only when it is an
    /// `https://` URL. Anything else means no rewrite.
    pub fn rewrite(&self, url: &str) -> Option<String> {
        if !url.starts_with("http://") {
            return None;
        }
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;

        for rule in self.lookup(host) {
            if let Some(rewritten) = rule.apply(url) {
                if rewritten.starts_with("https://") {
                    return Some(rewritten);
                }
                // First match decides; a non-https product means no rewrite.
                return None;
            }
        }
        None
    }

    /// Number of hosts with at least one rule.
    pub fn host_count(&self) -> usize {
        self.rules.len()
    }
}
