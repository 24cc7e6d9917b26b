//! Filesystem metadata source.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{FetchError, SourceResult};
use crate::fetcher::{FetchOutcome, MetadataSource, SourceConfig};
use crate::origin::OriginMetadata;

/// Fetches metadata from a local file.
///
/// The file's modification time serves as the conditional-fetch token: a
/// repeat fetch returns [`FetchOutcome::Unchanged`] while the mtime matches.
#[derive(Debug, Clone)]
pub struct FilesystemSource {
    path: PathBuf,
    config: SourceConfig,
}

impl FilesystemSource {
    /// Creates a source reading from the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: SourceConfig::default(),
        }
    }

    /// Sets the source configuration.
    #[must_use]
    pub fn with_config(mut self, config: SourceConfig) -> Self {
        self.config = config;
        self
    }

    /// The path this source reads from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self, conditional: Option<&OriginMetadata>) -> SourceResult<FetchOutcome> {
        let meta = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| classify_io(&self.path, &e))?;

        let modified = meta
            .modified()
            .ok()
            .map(DateTime::<Utc>::from);

        if self.config.conditional_fetch {
            if let (Some(modified), Some(prior)) = (modified, conditional) {
                if prior.last_modified == Some(modified) {
                    return Ok(FetchOutcome::Unchanged);
                }
            }
        }

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| classify_io(&self.path, &e))?;

        let mut origin = OriginMetadata::new(format!("file:{}", self.path.display()));
        if let Some(modified) = modified {
            origin = origin.with_last_modified(modified);
        }

        Ok(FetchOutcome::Document { bytes, origin })
    }
}

fn classify_io(path: &Path, err: &std::io::Error) -> FetchError {
    if err.kind() == std::io::ErrorKind::NotFound {
        FetchError::not_found(path.display().to_string())
    } else {
        FetchError::unreachable(format!("{}: {err}", path.display()))
    }
}

#[async_trait]
impl MetadataSource for FilesystemSource {
    async fn fetch(&self, conditional: Option<&OriginMetadata>) -> SourceResult<FetchOutcome> {
        tokio::time::timeout(self.config.timeout, self.read(conditional))
            .await
            .map_err(|_| FetchError::Timeout(self.config.timeout))?
    }

    fn description(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
