//! Federation metadata object model.
//!
//! This crate provides the data model for SAML federation trust metadata:
//!
//! - **Document model** - entity and role descriptors with validity attributes
//! - **XML parsing** - well-formedness-checked parsing of metadata documents
//! - **Validity attributes** - `validUntil` and `cacheDuration` handling
//!
//! The model is a closed set of tagged variants rather than an open type
//! hierarchy. Schema-level type binding for arbitrary extension elements is
//! out of scope; unrecognized elements are skipped during parsing.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod document;
pub mod entity;
pub mod error;
pub mod xml;

pub use document::{DocumentRoot, MetadataDocument};
pub use entity::{Endpoint, EntityDescriptor, KeyDescriptor, KeyUse, RoleDescriptor, RoleKind};
pub use error::{ModelError, ModelResult};
pub use xml::parse_metadata;
