//! Migration configuration
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! max_concurrent_fetches = 4
//! commit_mode = "best-effort"
//! http_timeout_secs = 10
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// What to keep when some fetches fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
    /// Fetch everything first; any failure leaves the asset untouched
    #[default]
    AllOrNothing,
    /// Commit the nodes whose fetch succeeded, then report the rest
    BestEffort,
}

/// Migration configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Upper bound on in-flight fetches; 1 fetches sequentially
    pub max_concurrent_fetches: usize,
    /// Commit policy on fetch failure
    pub commit_mode: CommitMode,
    /// Timeout of a single HTTP request, in seconds
    pub http_timeout_secs: u64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 1,
            commit_mode: CommitMode::AllOrNothing,
            http_timeout_secs: 30,
        }
    }
}

impl TransformConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With max concurrent fetches
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max;
        self
    }

    /// With commit mode
    #[inline]
    #[must_use]
    pub fn with_commit_mode(mut self, mode: CommitMode) -> Self {
        self.commit_mode = mode;
        self
    }

    /// With HTTP timeout
    #[inline]
    #[must_use]
    pub fn with_http_timeout_secs(mut self, secs: u64) -> Self {
        self.http_timeout_secs = secs;
        self
    }

    /// Parse from a TOML string
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` on malformed TOML or unknown values
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns `ConfigError::Read` if the file cannot be read, or
    /// `ConfigError::Parse` if it is not valid configuration
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Fetch limit actually used; zero is treated as one
    #[inline]
    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrent_fetches.max(1)
    }

    /// HTTP timeout as a duration
    #[inline]
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sequential_all_or_nothing() {
        let config = TransformConfig::default();
        assert_eq!(config.max_concurrent_fetches, 1);
        assert_eq!(config.commit_mode, CommitMode::AllOrNothing);
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = TransformConfig::from_toml_str("commit_mode = \"best-effort\"").unwrap();
        assert_eq!(config.commit_mode, CommitMode::BestEffort);
        assert_eq!(config.max_concurrent_fetches, 1);
    }

    #[test]
    fn full_toml() {
        let config = TransformConfig::from_toml_str(
            "max_concurrent_fetches = 8\ncommit_mode = \"all-or-nothing\"\nhttp_timeout_secs = 5\n",
        )
        .unwrap();
        assert_eq!(
            config,
            TransformConfig::new()
                .with_max_concurrent_fetches(8)
                .with_http_timeout_secs(5)
        );
    }

    #[test]
    fn unknown_commit_mode_is_rejected() {
        let err = TransformConfig::from_toml_str("commit_mode = \"sometimes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_concurrency_means_one() {
        let config = TransformConfig::new().with_max_concurrent_fetches(0);
        assert_eq!(config.effective_concurrency(), 1);
    }

    #[test]
    fn serializes_back_to_toml() {
        let config = TransformConfig::new().with_commit_mode(CommitMode::BestEffort);
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("commit_mode = \"best-effort\""));
        assert_eq!(TransformConfig::from_toml_str(&text).unwrap(), config);
    }
}
