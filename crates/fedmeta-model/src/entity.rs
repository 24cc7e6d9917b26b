//! Entity and role descriptor types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The function an entity exposes through a role.
///
/// Modeled as a closed set of variants; metadata role elements outside this
/// set are skipped at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleKind {
    /// Identity provider (asserting party).
    IdentityProvider,

    /// Service provider (relying party).
    ServiceProvider,

    /// Attribute authority.
    AttributeAuthority,
}

impl RoleKind {
    /// Returns a short human-readable name for logging.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IdentityProvider => "IDP",
            Self::ServiceProvider => "SP",
            Self::AttributeAuthority => "AA",
        }
    }
}

/// Intended usage of the key material in a [`KeyDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyUse {
    /// Signing only.
    Signing,

    /// Encryption only.
    Encryption,

    /// Both signing and encryption (the `use` attribute was absent).
    #[default]
    Both,
}

impl KeyUse {
    /// Returns true if the key may be used for signing.
    #[must_use]
    pub const fn allows_signing(&self) -> bool {
        matches!(self, Self::Signing | Self::Both)
    }
}

/// Trust material attached to a role.
///
/// Certificates are opaque DER blobs to this crate; signature verification
/// is an external capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDescriptor {
    /// Intended key usage.
    pub usage: KeyUse,

    /// X.509 certificates, DER-encoded.
    pub certificates: Vec<Vec<u8>>,
}

/// A protocol endpoint exposed by a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Binding identifier URI.
    pub binding: String,

    /// Endpoint location URI.
    pub location: String,

    /// Optional separate response location.
    pub response_location: Option<String>,

    /// Index for indexed endpoint types (e.g. assertion consumer services).
    pub index: Option<u16>,

    /// Whether this is the default among indexed endpoints.
    pub is_default: Option<bool>,
}

impl Endpoint {
    /// Creates an endpoint with just a binding and location.
    #[must_use]
    pub fn new(binding: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            binding: binding.into(),
            location: location.into(),
            response_location: None,
            index: None,
            is_default: None,
        }
    }
}

/// The capabilities an entity exposes for one particular function.
///
/// Role descriptors have no validity window of their own; they inherit the
/// enclosing document's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDescriptor {
    /// The role tag.
    pub kind: RoleKind,

    /// Supported protocol URIs from `protocolSupportEnumeration`.
    pub protocols: Vec<String>,

    /// Protocol endpoints.
    pub endpoints: Vec<Endpoint>,

    /// Trust material references.
    pub keys: Vec<KeyDescriptor>,
}

impl RoleDescriptor {
    /// Creates an empty role descriptor of the given kind.
    #[must_use]
    pub fn new(kind: RoleKind) -> Self {
        Self {
            kind,
            protocols: Vec::new(),
            endpoints: Vec::new(),
            keys: Vec::new(),
        }
    }

    /// Returns endpoints using the given binding URI.
    pub fn endpoints_for_binding<'a>(
        &'a self,
        binding: &'a str,
    ) -> impl Iterator<Item = &'a Endpoint> {
        self.endpoints.iter().filter(move |e| e.binding == binding)
    }
}

/// A federation participant, identified by a unique entity ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Federation-scoped, case-sensitive entity identifier. Never empty.
    pub entity_id: String,

    /// Absolute expiry instant, if declared on the entity element.
    pub valid_until: Option<DateTime<Utc>>,

    /// Relative re-fetch suggestion, if declared on the entity element.
    pub cache_duration: Option<std::time::Duration>,

    /// Roles offered by this entity.
    pub roles: Vec<RoleDescriptor>,
}

impl EntityDescriptor {
    /// Creates an entity descriptor with no roles.
    #[must_use]
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            valid_until: None,
            cache_duration: None,
            roles: Vec::new(),
        }
    }

    /// Returns the roles of the given kind.
    pub fn roles_of_kind(&self, kind: RoleKind) -> impl Iterator<Item = &RoleDescriptor> {
        self.roles.iter().filter(move |r| r.kind == kind)
    }

    /// Returns true if the entity offers at least one role of the given kind.
    #[must_use]
    pub fn has_role(&self, kind: RoleKind) -> bool {
        self.roles.iter().any(|r| r.kind == kind)
    }

    /// Returns true if the entity's own `validUntil` has passed.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|vu| vu <= now)
    }
}
