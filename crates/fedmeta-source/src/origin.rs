//! Origin metadata for conditional fetching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Validator-usable hints describing where and when a document was fetched.
///
/// Passing the metadata from a prior successful fetch back into
/// [`MetadataSource::fetch`](crate::MetadataSource::fetch) lets a source
/// short-circuit to "unchanged" when the origin supports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginMetadata {
    /// The URI the document was fetched from.
    pub source_uri: String,

    /// Opaque entity tag (HTTP ETag, or a source-specific generation tag).
    pub etag: Option<String>,

    /// Last-modified instant reported by the origin.
    pub last_modified: Option<DateTime<Utc>>,
}

impl OriginMetadata {
    /// Creates origin metadata with no conditional-fetch tokens.
    #[must_use]
    pub fn new(source_uri: impl Into<String>) -> Self {
        Self {
            source_uri: source_uri.into(),
            etag: None,
            last_modified: None,
        }
    }

    /// Sets the entity tag.
    #[must_use]
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Sets the last-modified instant.
    #[must_use]
    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// Returns true if this metadata carries any conditional-fetch token.
    #[must_use]
    pub fn supports_conditional(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }
}
