//! HTTP metadata source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::StatusCode;
use url::Url;

use crate::error::{FetchError, SourceResult};
use crate::fetcher::{FetchOutcome, MetadataSource, SourceConfig};
use crate::origin::OriginMetadata;

/// Fetches metadata from a network endpoint.
///
/// When the prior fetch produced an ETag or Last-Modified header and
/// conditional fetching is enabled, the request carries `If-None-Match` /
/// `If-Modified-Since` and a `304 Not Modified` response short-circuits to
/// [`FetchOutcome::Unchanged`].
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: Url,
    client: reqwest::Client,
    config: SourceConfig,
}

impl HttpSource {
    /// Creates a source fetching from the given URL.
    ///
    /// ## Errors
    ///
    /// Returns [`FetchError::Unreachable`] if the HTTP client cannot be
    /// constructed.
    pub fn new(url: Url) -> SourceResult<Self> {
        Self::with_config(url, SourceConfig::default())
    }

    /// Creates a source with an explicit configuration.
    ///
    /// ## Errors
    ///
    /// Returns [`FetchError::Unreachable`] if the HTTP client cannot be
    /// constructed.
    pub fn with_config(url: Url, config: SourceConfig) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::unreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { url, client, config })
    }

    /// The URL this source fetches from.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl MetadataSource for HttpSource {
    async fn fetch(&self, conditional: Option<&OriginMetadata>) -> SourceResult<FetchOutcome> {
        let conditional = self.config.conditional_fetch.then_some(conditional).flatten();
        fetch_url(&self.client, self.url.as_str(), conditional, &self.config).await
    }

    fn description(&self) -> String {
        self.url.to_string()
    }
}

/// Performs one HTTP GET with conditional headers, classifying failures
/// into the fetch error taxonomy. Shared with the per-entity template
/// source.
pub(crate) async fn fetch_url(
    client: &reqwest::Client,
    url: &str,
    conditional: Option<&OriginMetadata>,
    config: &SourceConfig,
) -> SourceResult<FetchOutcome> {
    let mut request = client.get(url);
    if let Some(prior) = conditional {
        if let Some(etag) = &prior.etag {
            request = request.header(IF_NONE_MATCH, etag.as_str());
        }
        if let Some(last_modified) = prior.last_modified {
            request = request.header(IF_MODIFIED_SINCE, http_date(last_modified));
        }
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            FetchError::Timeout(config.timeout)
        } else {
            FetchError::unreachable(format!("{url}: {e}"))
        }
    })?;

    match response.status() {
        StatusCode::NOT_MODIFIED => return Ok(FetchOutcome::Unchanged),
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            return Err(FetchError::not_found(url.to_string()));
        }
        status if !status.is_success() => {
            return Err(FetchError::unreachable(format!("{url}: HTTP {status}")));
        }
        _ => {}
    }

    let mut origin = OriginMetadata::new(url.to_string());
    if let Some(etag) = header_str(&response, ETAG) {
        origin = origin.with_etag(etag);
    }
    if let Some(last_modified) = header_str(&response, LAST_MODIFIED)
        .and_then(|v| DateTime::parse_from_rfc2822(&v).ok())
    {
        origin = origin.with_last_modified(last_modified.with_timezone(&Utc));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(config.timeout)
            } else {
                FetchError::unreachable(format!("{url}: {e}"))
            }
        })?
        .to_vec();

    Ok(FetchOutcome::Document { bytes, origin })
}

fn header_str(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Formats an instant as an RFC 7231 HTTP date.
fn http_date(instant: DateTime<Utc>) -> String {
    instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
