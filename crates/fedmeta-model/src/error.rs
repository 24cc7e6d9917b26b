//! Metadata model error types.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building the metadata object model.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The document is not well-formed or violates a model invariant.
    #[error("malformed metadata: {0}")]
    Malformed(String),

    /// The document root is not a recognized metadata element.
    #[error("unsupported document root: {0}")]
    UnsupportedRoot(String),
}

impl ModelError {
    /// Creates a malformed-document error.
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

impl From<quick_xml::Error> for ModelError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ModelError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Malformed(err.to_string())
    }
}
