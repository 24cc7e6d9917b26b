//! Source fetcher traits and configuration.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceResult;
use crate::origin::OriginMetadata;

/// Result of one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The origin reports the document is unchanged since the conditional
    /// tokens passed in; the caller keeps what it has.
    Unchanged,

    /// A document was fetched.
    Document {
        /// Raw document bytes.
        bytes: Vec<u8>,
        /// Hints for the next conditional fetch.
        origin: OriginMetadata,
    },
}

impl FetchOutcome {
    /// Returns true for the unchanged short-circuit.
    #[must_use]
    pub const fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }
}

/// A whole-document metadata origin.
///
/// Implementations apply their configured timeout internally and must be
/// cancellation-safe: callers may drop the fetch future (e.g. when a
/// resolver is destroyed mid-cycle) and no cleanup beyond dropping is
/// required.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetches the document, optionally short-circuiting to
    /// [`FetchOutcome::Unchanged`] when `conditional` tokens show the
    /// origin has not changed.
    async fn fetch(&self, conditional: Option<&OriginMetadata>) -> SourceResult<FetchOutcome>;

    /// Human-readable origin description for logging.
    fn description(&self) -> String;
}

/// A per-entity metadata origin for on-demand resolution.
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Fetches the metadata document for a single entity ID.
    async fn fetch_entity(&self, entity_id: &str) -> SourceResult<FetchOutcome>;

    /// Human-readable origin description for logging.
    fn description(&self) -> String;
}

/// Source fetch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Per-fetch timeout.
    pub timeout: Duration,

    /// Whether conditional fetching (ETag / Last-Modified / mtime) is
    /// attempted when prior origin metadata is available.
    pub conditional_fetch: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            conditional_fetch: true,
        }
    }
}

impl SourceConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fetch timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables conditional fetching.
    #[must_use]
    pub const fn with_conditional_fetch(mut self, enabled: bool) -> Self {
        self.conditional_fetch = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builders() {
        let config = SourceConfig::new()
            .with_timeout(Duration::from_secs(5))
            .with_conditional_fetch(false);

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.conditional_fetch);
    }
}
