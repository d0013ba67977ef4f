use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum::IntoEnumIterator;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;
use tokio_retry::strategy::ExponentialBackoff;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP transport.
    #[error("HTTP transport initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// A send failure, categorized for the fallback adapters.
///
/// The first three variants are recoverable by retrying over plain http;
/// everything else propagates to the caller untouched.
#[derive(Error, Debug)]
pub enum SendError {
    /// TCP connection refused, reset, or timed out.
    #[error("connection to {url} failed: {message}")]
    Connection {
        /// URL the send was addressed to
        url: String,
        /// Underlying error description
        message: String,
    },

    /// Connection-class failures persisted through every retry attempt.
    #[error("retries exhausted for {url}: {message}")]
    RetriesExhausted {
        /// URL the send was addressed to
        url: String,
        /// Last underlying error description
        message: String,
    },

    /// TLS negotiation or certificate failure.
    #[error("TLS failure for {url}: {message}")]
    Tls {
        /// URL the send was addressed to
        url: String,
        /// Underlying error description
        message: String,
    },

    /// A probe or rule produced a redirect to a scheme other than
    /// http/https. This indicates upstream misconfiguration, not a transient
    /// network condition, and is never recovered from.
    #[error("{url} redirected to unsupported scheme: {location}")]
    UnsupportedScheme {
        /// URL that was being probed or rewritten
        url: String,
        /// The offending redirect target
        location: String,
    },

    /// Any other transport failure.
    #[error("request to {url} failed: {message}")]
    Other {
        /// URL the send was addressed to
        url: String,
        /// Underlying error description
        message: String,
    },
}

impl SendError {
    /// True for the failure categories that justify falling back from a
    /// forced-https send to plain http.
    pub fn triggers_downgrade(&self) -> bool {
        matches!(
            self,
            SendError::Connection { .. }
                | SendError::RetriesExhausted { .. }
                | SendError::Tls { .. }
        )
    }
}

/// Construction-time configuration failures.
///
/// Ruleset and preload sources are loaded once, before the adapter sees any
/// traffic. A source that cannot be loaded fails construction loudly rather
/// than silently degrading to "never rewrite".
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A ruleset or preload file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was being read
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A ruleset file did not parse as the expected JSON shape.
    #[error("failed to parse ruleset {path}: {source}")]
    Parse {
        /// Path that was being parsed
        path: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// A rewrite rule pattern is not a valid regular expression.
    #[error("invalid rewrite rule pattern {pattern:?}: {source}")]
    Rule {
        /// The offending pattern
        pattern: String,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },
}

/// Kinds of decisions an adapter chain can make for a URL.
///
/// Each variant represents one auditable outcome in the rewrite pipeline,
/// counted across a run for the final summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum DecisionType {
    /// Synthesized an http→https redirect
    Upgraded,
    /// Synthesized an https→http redirect (excluded host or probe downgrade)
    Downgraded,
    /// Rewritten via the ruleset or preload list
    Rewritten,
    /// Forced https failed and the request was re-sent over http
    FellBack,
    /// Passed through to the transport unchanged
    Passed,
    /// The send failed
    Failed,
}

impl DecisionType {
    /// Human-readable label for summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionType::Upgraded => "Upgraded to https",
            DecisionType::Downgraded => "Downgraded to http",
            DecisionType::Rewritten => "Rewritten by rule",
            DecisionType::FellBack => "Fell back to http",
            DecisionType::Passed => "Passed through",
            DecisionType::Failed => "Failed",
        }
    }
}

/// Thread-safe decision counters.
///
/// Tracks the count of each decision type using atomic counters, allowing
/// concurrent access from multiple tasks. All decision types are initialized
/// to zero on creation.
pub struct DecisionStats {
    decisions: HashMap<DecisionType, AtomicUsize>,
}

impl DecisionStats {
    /// Creates a tracker with every counter at zero.
    pub fn new() -> Self {
        let mut decisions = HashMap::new();
        for decision in DecisionType::iter() {
            decisions.insert(decision, AtomicUsize::new(0));
        }
        DecisionStats { decisions }
    }

    /// Increments the counter for `decision`.
    pub fn increment(&self, decision: DecisionType) {
        // All DecisionType variants are initialized in new(), so unwrap() is safe
        self.decisions
            .get(&decision)
            .unwrap()
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Current count for `decision`.
    pub fn get_count(&self, decision: DecisionType) -> usize {
        // All DecisionType variants are initialized in new(), so unwrap() is safe
        self.decisions.get(&decision).unwrap().load(Ordering::SeqCst)
    }

    /// Sum of all counters.
    pub fn total(&self) -> usize {
        DecisionType::iter().map(|d| self.get_count(d)).sum()
    }
}

impl Default for DecisionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates an exponential backoff retry strategy.
///
/// Returns a retry strategy configured with:
/// - Initial delay: `RETRY_INITIAL_DELAY_MS` milliseconds
/// - Backoff factor: `RETRY_FACTOR` (doubles delay each retry)
/// - Maximum delay: `RETRY_MAX_DELAY_SECS` seconds
pub fn get_retry_strategy() -> ExponentialBackoff {
    ExponentialBackoff::from_millis(crate::config::RETRY_INITIAL_DELAY_MS)
        .factor(crate::config::RETRY_FACTOR)
        .max_delay(Duration::from_secs(crate::config::RETRY_MAX_DELAY_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_stats_initialization() {
        let stats = DecisionStats::new();
        for decision in DecisionType::iter() {
            assert_eq!(stats.get_count(decision), 0);
        }
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn test_decision_stats_increment() {
        let stats = DecisionStats::new();
        stats.increment(DecisionType::Upgraded);
        stats.increment(DecisionType::Upgraded);
        stats.increment(DecisionType::Failed);
        assert_eq!(stats.get_count(DecisionType::Upgraded), 2);
        assert_eq!(stats.get_count(DecisionType::Failed), 1);
        assert_eq!(stats.get_count(DecisionType::Downgraded), 0);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_downgrade_trigger_categories() {
        let connection = SendError::Connection {
            url: "https://x.com/".into(),
            message: "refused".into(),
        };
        let retries = SendError::RetriesExhausted {
            url: "https://x.com/".into(),
            message: "refused".into(),
        };
        let tls = SendError::Tls {
            url: "https://x.com/".into(),
            message: "bad certificate".into(),
        };
        let other = SendError::Other {
            url: "https://x.com/".into(),
            message: "boom".into(),
        };
        let scheme = SendError::UnsupportedScheme {
            url: "http://x.com/".into(),
            location: "ftp://x.com/".into(),
        };

        assert!(connection.triggers_downgrade());
        assert!(retries.triggers_downgrade());
        assert!(tls.triggers_downgrade());
        assert!(!other.triggers_downgrade());
        assert!(!scheme.triggers_downgrade());
    }
}
