//! In-memory metadata sources.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{FetchError, SourceResult};
use crate::fetcher::{EntitySource, FetchOutcome, MetadataSource, SourceConfig};
use crate::origin::OriginMetadata;

/// Serves metadata from a byte buffer.
///
/// The buffer can be swapped at runtime; a generation counter acts as the
/// conditional-fetch token, so repeat fetches of unswapped content
/// short-circuit to [`FetchOutcome::Unchanged`].
#[derive(Debug)]
pub struct InMemorySource {
    inner: RwLock<Buffer>,
    config: SourceConfig,
}

#[derive(Debug)]
struct Buffer {
    bytes: Vec<u8>,
    generation: u64,
}

impl InMemorySource {
    /// Creates a source serving the given bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: RwLock::new(Buffer {
                bytes: bytes.into(),
                generation: 0,
            }),
            config: SourceConfig::default(),
        }
    }

    /// Sets the source configuration.
    #[must_use]
    pub fn with_config(mut self, config: SourceConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the served bytes, bumping the generation so the next
    /// conditional fetch sees a change.
    pub fn set_bytes(&self, bytes: impl Into<Vec<u8>>) {
        let mut inner = self.inner.write();
        inner.bytes = bytes.into();
        inner.generation += 1;
    }
}

#[async_trait]
impl MetadataSource for InMemorySource {
    async fn fetch(&self, conditional: Option<&OriginMetadata>) -> SourceResult<FetchOutcome> {
        let inner = self.inner.read();
        let etag = inner.generation.to_string();

        if self.config.conditional_fetch {
            if let Some(prior) = conditional {
                if prior.etag.as_deref() == Some(etag.as_str()) {
                    return Ok(FetchOutcome::Unchanged);
                }
            }
        }

        Ok(FetchOutcome::Document {
            bytes: inner.bytes.clone(),
            origin: OriginMetadata::new("memory:").with_etag(etag),
        })
    }

    fn description(&self) -> String {
        "memory:".to_string()
    }
}

/// Serves per-entity metadata from a keyed map.
///
/// Counts fetches so callers can assert on lookup traffic (e.g. negative
/// cache behavior).
#[derive(Debug, Default)]
pub struct InMemoryEntitySource {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    fetches: AtomicU64,
}

impl InMemoryEntitySource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the document served for an entity ID.
    pub fn insert(&self, entity_id: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.write().insert(entity_id.into(), bytes.into());
    }

    /// Removes the document for an entity ID.
    pub fn remove(&self, entity_id: &str) {
        self.entries.write().remove(entity_id);
    }

    /// Total number of fetch attempts served, including not-found ones.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EntitySource for InMemoryEntitySource {
    async fn fetch_entity(&self, entity_id: &str) -> SourceResult<FetchOutcome> {
        self.fetches.fetch_add(1, Ordering::Relaxed);

        let entries = self.entries.read();
        match entries.get(entity_id) {
            Some(bytes) => Ok(FetchOutcome::Document {
                bytes: bytes.clone(),
                origin: OriginMetadata::new(format!("memory:{entity_id}")),
            }),
            None => Err(FetchError::not_found(entity_id.to_string())),
        }
    }

    fn description(&self) -> String {
        "memory-entity:".to_string()
    }
}
