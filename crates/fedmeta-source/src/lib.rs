//! Metadata source fetchers.
//!
//! This crate obtains raw metadata bytes from a configured origin:
//!
//! - [`FilesystemSource`] - a local file, with mtime-based change detection
//! - [`HttpSource`] - a network endpoint, with ETag/Last-Modified support
//! - [`InMemorySource`] - a byte buffer, swappable for tests
//! - [`TemplateHttpSource`] - a per-entity lookup endpoint for on-demand
//!   resolution
//!
//! Fetch failures are classified ([`FetchError`]) and reported distinctly
//! from parse failures; none of them are fatal to a resolver as a whole.
//! Repeated fetches can short-circuit to [`FetchOutcome::Unchanged`] using
//! the [`OriginMetadata`] hints returned by a prior fetch.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod fetcher;
pub mod filesystem;
pub mod http;
pub mod memory;
pub mod origin;
pub mod template;

pub use error::{FetchError, SourceResult};
pub use fetcher::{EntitySource, FetchOutcome, MetadataSource, SourceConfig};
pub use filesystem::FilesystemSource;
pub use http::HttpSource;
pub use memory::{InMemoryEntitySource, InMemorySource};
pub use origin::OriginMetadata;
pub use template::TemplateHttpSource;
