//! Filter rejection reasons.

use thiserror::Error;

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterRejection>;

/// Reasons a filter (or the index builder) aborts a resolve cycle.
///
/// Whether a rejection is fatal depends on the phase: during initial load
/// it fails the resolver, during a steady-state refresh the previously
/// published snapshot is retained.
#[derive(Debug, Clone, Error)]
pub enum FilterRejection {
    /// A document signature is present but does not verify against the
    /// trusted keys.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// A signature is required but the document carries none.
    #[error("document is not signed")]
    SignatureMissing,

    /// The document violates the configured validity window.
    #[error("validity window rejected: {0}")]
    ValidityExceeded(String),

    /// Two entities in one document share an entity ID. Never merged
    /// silently.
    #[error("duplicate entityID: {0}")]
    DuplicateEntityId(String),
}
