//! Metadata trust resolution engine.
//!
//! This crate ties fetching, filtering, and indexing together into
//! resolvers that serve a fast, always-available, periodically refreshed
//! view of federation trust metadata:
//!
//! - [`Snapshot`] - immutable, fully indexed result of one resolve cycle
//! - [`BatchMetadataResolver`] - whole-document resolution with a
//!   background refresh scheduler
//! - [`DynamicMetadataResolver`] - per-entity on-demand resolution with a
//!   negative cache
//!
//! # Concurrency
//!
//! Reads are lock-free: callers dereference whichever snapshot is
//! currently published (a single atomic pointer load) and never block on
//! an in-progress refresh. The refresh scheduler is the sole writer of the
//! published-snapshot reference; it builds each new snapshot fully off to
//! the side, so publication is the only synchronization point.
//!
//! # Failure isolation
//!
//! Once a resolver has loaded successfully, a fetch, parse, or filter
//! failure during refresh never disturbs readers: the previous snapshot
//! remains current and retries are scheduled with capped exponential
//! backoff. Stale-but-available data beats unavailability; callers can
//! consult [`ResolverStatus`] to apply their own staleness policy.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod config;
pub mod dynamic;
pub mod error;
mod scheduler;
pub mod snapshot;
pub mod state;

pub use batch::BatchMetadataResolver;
pub use config::ResolverConfig;
pub use dynamic::DynamicMetadataResolver;
pub use error::{ResolverError, ResolverResult};
pub use snapshot::{build_snapshot, Snapshot, SnapshotIter};
pub use state::{FailureRecord, LifecycleState, ResolverStatus};
