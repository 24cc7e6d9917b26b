//! Resolver error types.

use fedmeta_filter::FilterRejection;
use fedmeta_model::ModelError;
use fedmeta_source::FetchError;
use thiserror::Error;

/// Result type for resolver operations.
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Errors surfaced by resolver operations.
///
/// Fetch, parse, and filter failures during a steady-state refresh are
/// recovered internally and never reach lookup callers; the variants here
/// appear on lookups only for lifecycle violations, and on `initialize`
/// and dynamic-mode resolution where the caller drives the cycle.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The resolver has not (yet) completed a successful load.
    #[error("resolver is not initialized")]
    NotInitialized,

    /// The resolver has been destroyed; no further lookups are permitted.
    #[error("resolver has been destroyed")]
    AlreadyDestroyed,

    /// The initial load failed; the resolver never became active.
    #[error("resolver initialization failed: {0}")]
    InitializationFailed(String),

    /// A fetch failure, surfaced from dynamic-mode resolution.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A parse failure, surfaced from dynamic-mode resolution.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A filter-chain or index rejection, surfaced from dynamic-mode
    /// resolution.
    #[error(transparent)]
    Filter(#[from] FilterRejection),
}

impl ResolverError {
    /// Returns true for lifecycle errors (as opposed to resolve-cycle
    /// failures).
    #[must_use]
    pub const fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized | Self::AlreadyDestroyed | Self::InitializationFailed(_)
        )
    }
}
