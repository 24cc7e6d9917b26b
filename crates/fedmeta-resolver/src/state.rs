//! Resolver lifecycle state.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{ResolverError, ResolverResult};

/// Lifecycle states of a resolver.
///
/// Transitions happen only through resolver and scheduler calls; there is
/// no other way to move between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// Created but not yet loaded.
    Uninitialized,

    /// Loaded successfully; lookups are served.
    Active,

    /// The initial load failed; lookups fail until a successful re-load.
    Failed,

    /// Destroyed; no further lookups are permitted.
    Destroyed,
}

/// A recorded refresh failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// When the failure occurred.
    pub at: DateTime<Utc>,

    /// Failure description.
    pub message: String,
}

/// Point-in-time view of a resolver's health.
///
/// Lookups on a resolver serving stale data still succeed; `stale` lets
/// callers apply their own policy (e.g. refuse trust decisions on data
/// older than a threshold).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverStatus {
    /// Current lifecycle state.
    pub state: LifecycleState,

    /// Instant of the last successful refresh.
    pub last_success: Option<DateTime<Utc>>,

    /// Most recent failure, if any since the last success.
    pub last_failure: Option<FailureRecord>,

    /// Consecutive failures since the last success.
    pub consecutive_failures: u32,

    /// True when served data is older than the configured staleness
    /// threshold.
    pub stale: bool,
}

#[derive(Debug)]
struct Inner {
    state: LifecycleState,
    last_success: Option<DateTime<Utc>>,
    last_failure: Option<FailureRecord>,
    consecutive_failures: u32,
}

/// Shared mutable lifecycle state, written by the scheduler and explicit
/// lifecycle calls only.
#[derive(Debug)]
pub(crate) struct StateCell {
    inner: RwLock<Inner>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                state: LifecycleState::Uninitialized,
                last_success: None,
                last_failure: None,
                consecutive_failures: 0,
            }),
        }
    }

    pub(crate) fn state(&self) -> LifecycleState {
        self.inner.read().state
    }

    pub(crate) fn set_state(&self, state: LifecycleState) {
        self.inner.write().state = state;
    }

    /// Records a successful refresh, resetting the failure streak.
    pub(crate) fn record_success(&self, at: DateTime<Utc>) {
        let mut inner = self.inner.write();
        inner.last_success = Some(at);
        inner.last_failure = None;
        inner.consecutive_failures = 0;
    }

    /// Records a refresh failure; returns the new consecutive count.
    pub(crate) fn record_failure(&self, at: DateTime<Utc>, message: String) -> u32 {
        let mut inner = self.inner.write();
        inner.last_failure = Some(FailureRecord { at, message });
        inner.consecutive_failures += 1;
        inner.consecutive_failures
    }

    /// Fails lookups on resolvers that are not serving data.
    pub(crate) fn ensure_readable(&self) -> ResolverResult<()> {
        match self.state() {
            LifecycleState::Active => Ok(()),
            LifecycleState::Uninitialized | LifecycleState::Failed => {
                Err(ResolverError::NotInitialized)
            }
            LifecycleState::Destroyed => Err(ResolverError::AlreadyDestroyed),
        }
    }

    pub(crate) fn status(
        &self,
        max_staleness: Option<Duration>,
        now: DateTime<Utc>,
    ) -> ResolverStatus {
        let inner = self.inner.read();
        let stale = inner.state == LifecycleState::Active
            && max_staleness.is_some_and(|max| {
                inner.last_success.map_or(true, |at| {
                    chrono::Duration::from_std(max)
                        .map(|max| now - at > max)
                        .unwrap_or(false)
                })
            });

        ResolverStatus {
            state: inner.state,
            last_success: inner.last_success,
            last_failure: inner.last_failure.clone(),
            consecutive_failures: inner.consecutive_failures,
            stale,
        }
    }
}
