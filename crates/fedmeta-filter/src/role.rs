//! Entity role allow-list filtering.

use fedmeta_model::{MetadataDocument, RoleKind};

use crate::chain::MetadataFilter;
use crate::context::FilterContext;
use crate::error::FilterResult;

/// Retains only role descriptors whose kind is in an allow-list.
///
/// Disallowed roles are dropped without aborting the cycle. By default an
/// entity left with no roles still appears in the result (resolvable by
/// ID, with no role descriptors); `remove_roleless_entities` drops such
/// entities entirely.
#[derive(Debug, Clone)]
pub struct EntityRoleFilter {
    allowed: Vec<RoleKind>,
    remove_roleless_entities: bool,
}

impl EntityRoleFilter {
    /// Creates a filter with the given role allow-list.
    #[must_use]
    pub fn new(allowed: Vec<RoleKind>) -> Self {
        Self {
            allowed,
            remove_roleless_entities: false,
        }
    }

    /// Drops entities that end up with no surviving roles.
    #[must_use]
    pub const fn remove_roleless_entities(mut self, remove: bool) -> Self {
        self.remove_roleless_entities = remove;
        self
    }

    /// The allowed role kinds.
    #[must_use]
    pub fn allowed(&self) -> &[RoleKind] {
        &self.allowed
    }
}

impl MetadataFilter for EntityRoleFilter {
    fn name(&self) -> &'static str {
        "entity-role"
    }

    fn filter(
        &self,
        mut document: MetadataDocument,
        _context: &mut FilterContext,
    ) -> FilterResult<MetadataDocument> {
        for entity in document.entities_mut() {
            entity.roles.retain(|role| self.allowed.contains(&role.kind));
        }

        if self.remove_roleless_entities {
            let before = document.entity_count();
            document.retain_entities(|entity| !entity.roles.is_empty());
            let dropped = before - document.entity_count();
            if dropped > 0 {
                tracing::debug!(dropped, "dropped entities with no surviving role");
            }
        }

        Ok(document)
    }
}
