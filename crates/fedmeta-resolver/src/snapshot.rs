//! Immutable, indexed metadata snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fedmeta_filter::FilterRejection;
use fedmeta_model::{EntityDescriptor, MetadataDocument, RoleDescriptor, RoleKind};

/// An immutable, fully indexed, point-in-time view of resolved metadata.
///
/// Multiple snapshots may exist concurrently (an old one held by in-flight
/// readers, a new one being built); exactly one is published at a time. A
/// changed view is always a brand-new snapshot; an existing one is never
/// mutated.
#[derive(Debug)]
pub struct Snapshot {
    entities: HashMap<String, Arc<EntityDescriptor>>,
    by_role: HashMap<(String, RoleKind), Arc<[RoleDescriptor]>>,
    resolved_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Creates an empty snapshot. A filter chain that removes every entity
    /// produces one of these; lookups simply find no matches.
    #[must_use]
    pub fn empty(resolved_at: DateTime<Utc>) -> Self {
        Self {
            entities: HashMap::new(),
            by_role: HashMap::new(),
            resolved_at,
            expires_at: None,
        }
    }

    /// Point lookup by entity ID.
    #[must_use]
    pub fn entity(&self, entity_id: &str) -> Option<Arc<EntityDescriptor>> {
        self.entities.get(entity_id).cloned()
    }

    /// Role descriptors for an (entity ID, role kind) pair. Empty when the
    /// entity is unknown or offers no such role.
    #[must_use]
    pub fn roles(&self, entity_id: &str, kind: RoleKind) -> Vec<RoleDescriptor> {
        self.by_role
            .get(&(entity_id.to_string(), kind))
            .map(|roles| roles.to_vec())
            .unwrap_or_default()
    }

    /// Returns true if the entity ID is present.
    #[must_use]
    pub fn contains(&self, entity_id: &str) -> bool {
        self.entities.contains_key(entity_id)
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the snapshot holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// When this snapshot was resolved.
    #[must_use]
    pub const fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }

    /// The document-declared expiry, if any.
    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Entities sorted by entity ID, for deterministic iteration.
    #[must_use]
    pub fn entities_sorted(&self) -> Vec<Arc<EntityDescriptor>> {
        let mut entities: Vec<_> = self.entities.values().cloned().collect();
        entities.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        entities
    }

    /// Iterator over the entities captured in this snapshot.
    #[must_use]
    pub fn iter(&self) -> SnapshotIter {
        SnapshotIter::new(self.entities_sorted())
    }
}

/// Builds a snapshot from a filtered document in a single linear pass.
///
/// ## Errors
///
/// Returns [`FilterRejection::DuplicateEntityId`] when two entities in the
/// document share an ID; duplicates abort the cycle rather than merging
/// silently.
pub fn build_snapshot(
    document: MetadataDocument,
    resolved_at: DateTime<Utc>,
) -> Result<Snapshot, FilterRejection> {
    let expires_at = document.valid_until;

    let mut entities = HashMap::new();
    let mut by_role: HashMap<(String, RoleKind), Vec<RoleDescriptor>> = HashMap::new();

    for entity in document.into_entities() {
        let entity_id = entity.entity_id.clone();
        if entities.contains_key(&entity_id) {
            return Err(FilterRejection::DuplicateEntityId(entity_id));
        }

        for role in &entity.roles {
            by_role
                .entry((entity_id.clone(), role.kind))
                .or_default()
                .push(role.clone());
        }

        entities.insert(entity_id, Arc::new(entity));
    }

    Ok(Snapshot {
        entities,
        by_role: by_role
            .into_iter()
            .map(|(key, roles)| (key, Arc::from(roles)))
            .collect(),
        resolved_at,
        expires_at,
    })
}

/// Finite, restartable iterator over the entities of one snapshot.
///
/// Reflects the snapshot captured when it was created; concurrent
/// refreshes do not affect it. Obtain a fresh one to observe newer data.
#[derive(Debug)]
pub struct SnapshotIter {
    entities: std::vec::IntoIter<Arc<EntityDescriptor>>,
}

impl SnapshotIter {
    pub(crate) fn new(entities: Vec<Arc<EntityDescriptor>>) -> Self {
        Self {
            entities: entities.into_iter(),
        }
    }
}

impl Iterator for SnapshotIter {
    type Item = Arc<EntityDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entities.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entities.size_hint()
    }
}

impl ExactSizeIterator for SnapshotIter {}
