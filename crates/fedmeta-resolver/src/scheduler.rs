//! Background refresh scheduling.
//!
//! One refresh task per batch resolver, owned by the resolver and joined
//! on teardown. The task drives the fetch -> parse -> filter -> index ->
//! publish cycle on a timer derived from the published snapshot's own
//! declared validity.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use fedmeta_filter::{keys, FilterChain, FilterContext};
use fedmeta_model::parse_metadata;
use fedmeta_source::{FetchOutcome, MetadataSource, OriginMetadata};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::config::ResolverConfig;
use crate::error::ResolverResult;
use crate::snapshot::{build_snapshot, Snapshot};
use crate::state::StateCell;

/// Result of one resolve cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CycleOutcome {
    /// A new snapshot was published.
    Published,

    /// The origin reported no change; the current snapshot was re-armed.
    Unchanged,
}

/// The shared resolve pipeline: source, filter chain, published snapshot,
/// and lifecycle state.
///
/// The refresh task is the sole writer of the published-snapshot
/// reference; readers load it lock-free.
pub(crate) struct RefreshPipeline {
    pub(crate) id: String,
    pub(crate) config: ResolverConfig,
    pub(crate) source: Arc<dyn MetadataSource>,
    pub(crate) chain: Arc<FilterChain>,
    pub(crate) published: ArcSwapOption<Snapshot>,
    pub(crate) state: StateCell,
    origin: Mutex<Option<OriginMetadata>>,
    refresh_hint: Mutex<Option<Duration>>,
}

impl RefreshPipeline {
    pub(crate) fn new(
        id: String,
        config: ResolverConfig,
        source: Arc<dyn MetadataSource>,
        chain: FilterChain,
    ) -> Self {
        Self {
            id,
            config,
            source,
            chain: Arc::new(chain),
            published: ArcSwapOption::empty(),
            state: StateCell::new(),
            origin: Mutex::new(None),
            refresh_hint: Mutex::new(None),
        }
    }

    /// Runs one resolve cycle: fetch, parse, filter, index, publish.
    ///
    /// On any error the previously published snapshot is left untouched;
    /// the caller decides whether the failure is fatal (first load) or
    /// retried (steady state).
    pub(crate) async fn run_cycle(&self) -> ResolverResult<CycleOutcome> {
        let conditional = self.origin.lock().clone();
        let outcome = self.source.fetch(conditional.as_ref()).await?;

        let (bytes, origin) = match outcome {
            FetchOutcome::Unchanged => {
                tracing::debug!(resolver = %self.id, "origin unchanged, skipping re-index");
                return Ok(CycleOutcome::Unchanged);
            }
            FetchOutcome::Document { bytes, origin } => (bytes, origin),
        };

        let document = parse_metadata(&bytes)?;

        let mut context = FilterContext::new();
        context.insert(keys::RAW_DOCUMENT, bytes);
        let document = self.chain.apply(document, &mut context)?;

        let now = Utc::now();
        let cache_hint = document.cache_duration;
        let snapshot = build_snapshot(document, now)?;
        let entities = snapshot.len();

        // The only synchronization point: a single atomic pointer swap.
        self.published.store(Some(Arc::new(snapshot)));
        *self.origin.lock() = Some(origin);
        *self.refresh_hint.lock() = cache_hint;

        tracing::info!(resolver = %self.id, entities, "published metadata snapshot");
        Ok(CycleOutcome::Published)
    }

    /// Delay until the next refresh attempt.
    ///
    /// `clamp(cacheDuration, min, max)`, additionally capped so the next
    /// attempt lands a safety margin before the snapshot's `validUntil`,
    /// and never below the minimum delay.
    pub(crate) fn next_refresh_delay(&self, now: DateTime<Utc>) -> Duration {
        let hint = *self.refresh_hint.lock();
        let mut delay = hint
            .unwrap_or(self.config.max_refresh_delay)
            .clamp(self.config.min_refresh_delay, self.config.max_refresh_delay);

        let expires_at = self.published.load().as_ref().and_then(|s| s.expires_at());
        if let Some(expires_at) = expires_at {
            let margin = chrono::Duration::from_std(self.config.expiration_safety_margin)
                .unwrap_or_else(|_| chrono::Duration::zero());
            let until_expiry = (expires_at - margin - now).to_std().unwrap_or_default();
            delay = delay.min(until_expiry);
        }

        delay.max(self.config.min_refresh_delay)
    }
}

/// The background refresh loop.
///
/// Runs until the shutdown signal fires; an in-flight cycle is cancelled
/// by the shutdown race, so destroying a resolver does not wait out a slow
/// fetch.
pub(crate) async fn run_refresh_loop(
    pipeline: Arc<RefreshPipeline>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut delay = pipeline.next_refresh_delay(Utc::now());

    loop {
        tracing::debug!(resolver = %pipeline.id, next_refresh = ?delay, "refresh scheduled");
        tokio::select! {
            _ = shutdown.changed() => break,
            () = tokio::time::sleep(delay) => {}
        }

        let cycle = tokio::select! {
            _ = shutdown.changed() => break,
            result = pipeline.run_cycle() => result,
        };

        let now = Utc::now();
        match cycle {
            Ok(_) => {
                pipeline.state.record_success(now);
                delay = pipeline.next_refresh_delay(now);
            }
            Err(error) => {
                // Fail-open: the previous snapshot stays current, readers
                // are undisturbed, and the retry backs off.
                let failures = pipeline.state.record_failure(now, error.to_string());
                delay = pipeline.config.backoff_delay(failures);
                tracing::warn!(
                    resolver = %pipeline.id,
                    %error,
                    failures,
                    retry_in = ?delay,
                    "metadata refresh failed; retaining previous snapshot"
                );
            }
        }
    }

    tracing::debug!(resolver = %pipeline.id, "refresh loop stopped");
}
