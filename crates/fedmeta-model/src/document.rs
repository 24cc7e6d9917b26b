//! Metadata document root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::EntityDescriptor;

/// Root of a metadata document: a single entity or a group of entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocumentRoot {
    /// A single entity descriptor.
    Entity(EntityDescriptor),

    /// A group of entity descriptors. Nested groups are flattened at parse
    /// time.
    Group(Vec<EntityDescriptor>),
}

/// A parsed metadata document.
///
/// Immutable by convention once it leaves the filter chain: the pipeline
/// instance processing a document owns it exclusively until it is indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    /// Document root.
    pub root: DocumentRoot,

    /// Absolute expiry instant declared on the root element.
    pub valid_until: Option<DateTime<Utc>>,

    /// Relative re-fetch suggestion declared on the root element.
    pub cache_duration: Option<std::time::Duration>,
}

impl MetadataDocument {
    /// Creates a document from a group of entities.
    #[must_use]
    pub fn group(entities: Vec<EntityDescriptor>) -> Self {
        Self {
            root: DocumentRoot::Group(entities),
            valid_until: None,
            cache_duration: None,
        }
    }

    /// Creates a document from a single entity.
    #[must_use]
    pub fn single(entity: EntityDescriptor) -> Self {
        Self {
            root: DocumentRoot::Entity(entity),
            valid_until: None,
            cache_duration: None,
        }
    }

    /// Sets the root `validUntil` attribute.
    #[must_use]
    pub fn with_valid_until(mut self, valid_until: DateTime<Utc>) -> Self {
        self.valid_until = Some(valid_until);
        self
    }

    /// Sets the root `cacheDuration` attribute.
    #[must_use]
    pub fn with_cache_duration(mut self, cache_duration: std::time::Duration) -> Self {
        self.cache_duration = Some(cache_duration);
        self
    }

    /// Returns the entities in document order.
    #[must_use]
    pub fn entities(&self) -> &[EntityDescriptor] {
        match &self.root {
            DocumentRoot::Entity(entity) => std::slice::from_ref(entity),
            DocumentRoot::Group(entities) => entities,
        }
    }

    /// Returns mutable access to the entities.
    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut EntityDescriptor> {
        match &mut self.root {
            DocumentRoot::Entity(entity) => std::slice::from_mut(entity).iter_mut(),
            DocumentRoot::Group(entities) => entities.as_mut_slice().iter_mut(),
        }
    }

    /// Consumes the document, returning its entities.
    #[must_use]
    pub fn into_entities(self) -> Vec<EntityDescriptor> {
        match self.root {
            DocumentRoot::Entity(entity) => vec![entity],
            DocumentRoot::Group(entities) => entities,
        }
    }

    /// Keeps only the entities for which the predicate returns true.
    ///
    /// A single-entity root that is removed becomes an empty group; an
    /// empty document is a valid filter outcome, not an error.
    pub fn retain_entities(&mut self, mut keep: impl FnMut(&EntityDescriptor) -> bool) {
        match &mut self.root {
            DocumentRoot::Entity(entity) => {
                if !keep(entity) {
                    self.root = DocumentRoot::Group(Vec::new());
                }
            }
            DocumentRoot::Group(entities) => entities.retain(|e| keep(e)),
        }
    }

    /// Number of entities in the document.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities().len()
    }

    /// Returns true if the document contains no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entity_count() == 0
    }
}
