//! Fetch error types.

use std::time::Duration;

use thiserror::Error;

/// Result type for source operations.
pub type SourceResult<T> = Result<T, FetchError>;

/// Errors raised while fetching metadata bytes from an origin.
///
/// None of these are fatal to the resolver as a whole; the refresh
/// scheduler decides retry policy.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The origin could not be reached or produced a transport-level error.
    #[error("metadata source unreachable: {0}")]
    Unreachable(String),

    /// The origin reports that the requested metadata does not exist.
    #[error("metadata not found: {0}")]
    NotFound(String),

    /// The fetch did not complete within the configured timeout.
    #[error("metadata fetch timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    /// Creates an unreachable-origin error.
    #[must_use]
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Returns true for not-found results, which dynamic resolvers treat
    /// as negative-cacheable rather than transient.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
