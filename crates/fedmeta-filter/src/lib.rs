//! Metadata filter chain.
//!
//! Enforces trust and hygiene policy on parsed metadata before it is
//! indexed:
//!
//! - [`FilterChain`] - ordered, configurable sequence of independent filters
//! - [`SignatureValidationFilter`] - document signature enforcement via an
//!   external [`SignatureVerifier`] capability
//! - [`ValidityWindowFilter`] - `validUntil` window enforcement
//! - [`EntityRoleFilter`] - role allow-list filtering
//!
//! Each filter may pass a document through unchanged, replace it with a
//! mutated one, or reject it, aborting the whole resolve cycle. Chain
//! execution stops at the first rejection. A filter that removes every
//! entity is not an error; an empty document is a valid outcome.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chain;
pub mod context;
pub mod error;
pub mod role;
pub mod signature;
pub mod validity;

pub use chain::{FilterChain, MetadataFilter};
pub use context::{keys, FilterContext};
pub use error::{FilterRejection, FilterResult};
pub use role::EntityRoleFilter;
pub use signature::{SignatureValidationFilter, SignatureVerifier, TrustedKeySet};
pub use validity::ValidityWindowFilter;
