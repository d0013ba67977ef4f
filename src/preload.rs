//! Preload domain list: domains for which https is always preferred.

use std::collections::HashSet;
use std::path::Path;

use log::info;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error_handling::ConfigError;

/// An immutable set of domains matched by exact host or any subdomain.
///
/// Loaded once at adapter construction and never mutated afterwards, so
/// concurrent lookups need no locking.
#[derive(Debug, Default)]
pub struct PreloadDomains {
    domains: HashSet<String>,
}

impl PreloadDomains {
    /// Builds a set from an iterator of domains. Domains are lowercased.
    pub fn from_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        PreloadDomains {
            domains: domains
                .into_iter()
                .map(|d| d.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Loads a domain list from a file, one domain per line.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be opened or read.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;

        let mut domains = HashSet::new();
        let mut lines = BufReader::new(file).lines();
        while let Some(line) = lines.next_line().await.map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })? {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            domains.insert(trimmed.to_ascii_lowercase());
        }

        info!(
            "loaded {} preload domain(s) from {}",
            domains.len(),
            path.display()
        );
        Ok(PreloadDomains { domains })
    }

    /// True when `host` is in the set, or any parent domain of it is.
    pub fn contains(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let mut candidate = host.as_str();
        loop {
            if self.domains.contains(candidate) {
                return true;
            }
            match candidate.split_once('.') {
                Some((_, rest)) if !rest.is_empty() => candidate = rest,
                _ => return false,
            }
        }
    }

    /// Number of domains in the set.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// True when the set is empty.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}
