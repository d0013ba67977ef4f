//! Exclusion list for hosts pinned to plain http.

/// An ordered list of scheme-stripped URL prefixes exempt from forced https.
///
/// A URL is excluded when its tail (the URL with the leading `http://` or
/// `https://` removed) starts with any configured prefix. Matching is
/// deliberately simple: exact prefix, case-sensitive, no trailing-slash
/// handling. Existing exclusion lists depend on these exact semantics.
#[derive(Debug, Clone, Default)]
pub struct HttpsExclusions {
    prefixes: Vec<String>,
}

impl HttpsExclusions {
    /// Creates an exclusion list from `prefixes`.
    pub fn new(prefixes: Vec<String>) -> Self {
        HttpsExclusions { prefixes }
    }

    /// True when `tail` starts with any configured prefix.
    ///
    /// Any match suffices; order does not affect the outcome.
    pub fn is_excluded(&self, tail: &str) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| tail.starts_with(prefix.as_str()))
    }
}
