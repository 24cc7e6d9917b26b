//! Per-entity template URL source.

use async_trait::async_trait;
use url::form_urlencoded;

use crate::error::{FetchError, SourceResult};
use crate::fetcher::{EntitySource, FetchOutcome, SourceConfig};
use crate::http::fetch_url;
use crate::origin::OriginMetadata;

/// Placeholder substituted with the URL-encoded entity ID.
pub const ENTITY_ID_PLACEHOLDER: &str = "{entityID}";

/// Fetches per-entity metadata from a templated lookup endpoint.
///
/// The template's `{entityID}` placeholder is replaced with the URL-encoded
/// entity ID, e.g. `https://mdq.example.org/entities/{entityID}`. In
/// well-known-location mode an entity ID that is itself an http(s) URL is
/// fetched directly, bypassing the template.
#[derive(Debug, Clone)]
pub struct TemplateHttpSource {
    template: String,
    client: reqwest::Client,
    config: SourceConfig,
    well_known_location: bool,
}

impl TemplateHttpSource {
    /// Creates a source with the given URL template.
    ///
    /// ## Errors
    ///
    /// Returns [`FetchError::Unreachable`] if the template lacks the
    /// `{entityID}` placeholder or the HTTP client cannot be constructed.
    pub fn new(template: impl Into<String>) -> SourceResult<Self> {
        Self::with_config(template, SourceConfig::default())
    }

    /// Creates a source with an explicit configuration.
    ///
    /// ## Errors
    ///
    /// Returns [`FetchError::Unreachable`] if the template lacks the
    /// `{entityID}` placeholder or the HTTP client cannot be constructed.
    pub fn with_config(template: impl Into<String>, config: SourceConfig) -> SourceResult<Self> {
        let template = template.into();
        if !template.contains(ENTITY_ID_PLACEHOLDER) {
            return Err(FetchError::unreachable(format!(
                "metadata URL template '{template}' has no {ENTITY_ID_PLACEHOLDER} placeholder"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::unreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            template,
            client,
            config,
            well_known_location: false,
        })
    }

    /// Enables well-known-location mode: entity IDs that are http(s) URLs
    /// are fetched directly instead of through the template.
    #[must_use]
    pub const fn with_well_known_location(mut self, enabled: bool) -> Self {
        self.well_known_location = enabled;
        self
    }

    /// Builds the lookup URL for an entity ID.
    #[must_use]
    pub fn url_for(&self, entity_id: &str) -> String {
        if self.well_known_location
            && (entity_id.starts_with("https://") || entity_id.starts_with("http://"))
        {
            return entity_id.to_string();
        }

        let encoded: String = form_urlencoded::byte_serialize(entity_id.as_bytes()).collect();
        self.template.replace(ENTITY_ID_PLACEHOLDER, &encoded)
    }
}

#[async_trait]
impl EntitySource for TemplateHttpSource {
    async fn fetch_entity(&self, entity_id: &str) -> SourceResult<FetchOutcome> {
        let url = self.url_for(entity_id);
        tracing::debug!(%entity_id, %url, "fetching per-entity metadata");

        match fetch_url(&self.client, &url, None, &self.config).await {
            // A lookup endpoint never gets conditional tokens, so Unchanged
            // cannot occur; treat it as missing if a proxy misbehaves.
            Ok(FetchOutcome::Unchanged) => Err(FetchError::not_found(entity_id.to_string())),
            other => other.map(|outcome| match outcome {
                FetchOutcome::Document { bytes, .. } => FetchOutcome::Document {
                    bytes,
                    origin: OriginMetadata::new(url),
                },
                FetchOutcome::Unchanged => FetchOutcome::Unchanged,
            }),
        }
    }

    fn description(&self) -> String {
        self.template.clone()
    }
}
