//! Batch-mode resolver facade.

use std::sync::Arc;

use chrono::Utc;
use fedmeta_filter::FilterChain;
use fedmeta_model::{EntityDescriptor, RoleDescriptor, RoleKind};
use fedmeta_source::MetadataSource;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ResolverConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::scheduler::{run_refresh_loop, RefreshPipeline};
use crate::snapshot::SnapshotIter;
use crate::state::{LifecycleState, ResolverStatus};

/// Resolves a whole metadata document at once and serves lookups from an
/// indexed snapshot, refreshed in the background.
///
/// `initialize` performs the first load inline; any failure there is fatal
/// and the resolver never activates. Once active, refresh failures are
/// absorbed: readers keep seeing the previous snapshot and retries back
/// off. `destroy` cancels any in-flight fetch and joins the background
/// task before returning.
pub struct BatchMetadataResolver {
    pipeline: Arc<RefreshPipeline>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BatchMetadataResolver {
    /// Creates a resolver. No I/O happens until [`initialize`].
    ///
    /// ## Errors
    ///
    /// Returns [`ResolverError::InitializationFailed`] for an inconsistent
    /// configuration.
    ///
    /// [`initialize`]: Self::initialize
    pub fn new(
        id: impl Into<String>,
        config: ResolverConfig,
        source: Arc<dyn MetadataSource>,
        chain: FilterChain,
    ) -> ResolverResult<Self> {
        config.validate()?;
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            pipeline: Arc::new(RefreshPipeline::new(id.into(), config, source, chain)),
            shutdown,
            task: Mutex::new(None),
        })
    }

    /// The resolver identifier, used in logs.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.pipeline.id
    }

    /// Performs the initial load and starts the refresh scheduler.
    ///
    /// Idempotent while active. A resolver whose first load failed may be
    /// re-initialized; until a load succeeds every lookup fails with
    /// [`ResolverError::NotInitialized`].
    ///
    /// ## Errors
    ///
    /// Returns [`ResolverError::InitializationFailed`] when the first
    /// fetch/parse/filter/index cycle fails, and
    /// [`ResolverError::AlreadyDestroyed`] after `destroy`.
    pub async fn initialize(&self) -> ResolverResult<()> {
        match self.pipeline.state.state() {
            LifecycleState::Destroyed => return Err(ResolverError::AlreadyDestroyed),
            LifecycleState::Active => return Ok(()),
            LifecycleState::Uninitialized | LifecycleState::Failed => {}
        }

        match self.pipeline.run_cycle().await {
            Ok(_) => {
                self.pipeline.state.record_success(Utc::now());
                self.pipeline.state.set_state(LifecycleState::Active);

                let handle = tokio::spawn(run_refresh_loop(
                    Arc::clone(&self.pipeline),
                    self.shutdown.subscribe(),
                ));
                *self.task.lock() = Some(handle);

                tracing::info!(resolver = %self.pipeline.id, "metadata resolver initialized");
                Ok(())
            }
            Err(error) => {
                self.pipeline.state.record_failure(Utc::now(), error.to_string());
                self.pipeline.state.set_state(LifecycleState::Failed);
                Err(ResolverError::InitializationFailed(error.to_string()))
            }
        }
    }

    /// Point lookup by entity ID against the current snapshot.
    ///
    /// ## Errors
    ///
    /// Fails only for lifecycle reasons; an unknown entity is `Ok(None)`.
    pub fn resolve_by_id(&self, entity_id: &str) -> ResolverResult<Option<Arc<EntityDescriptor>>> {
        self.pipeline.state.ensure_readable()?;
        let snapshot = self
            .pipeline
            .published
            .load_full()
            .ok_or(ResolverError::NotInitialized)?;
        Ok(snapshot.entity(entity_id))
    }

    /// Role descriptors for an (entity ID, role kind) pair.
    ///
    /// ## Errors
    ///
    /// Fails only for lifecycle reasons; no surviving role is an empty
    /// vector.
    pub fn resolve_by_role(
        &self,
        entity_id: &str,
        kind: RoleKind,
    ) -> ResolverResult<Vec<RoleDescriptor>> {
        self.pipeline.state.ensure_readable()?;
        let snapshot = self
            .pipeline
            .published
            .load_full()
            .ok_or(ResolverError::NotInitialized)?;
        Ok(snapshot.roles(entity_id, kind))
    }

    /// Iterates the entities of the snapshot current at call time.
    ///
    /// The iterator is finite, restartable (call again for a fresh one),
    /// and snapshot-consistent: a refresh publishing mid-iteration does
    /// not affect it.
    ///
    /// ## Errors
    ///
    /// Fails only for lifecycle reasons.
    pub fn iterate(&self) -> ResolverResult<SnapshotIter> {
        self.pipeline.state.ensure_readable()?;
        let snapshot = self
            .pipeline
            .published
            .load_full()
            .ok_or(ResolverError::NotInitialized)?;
        Ok(snapshot.iter())
    }

    /// Current lifecycle and staleness report.
    #[must_use]
    pub fn status(&self) -> ResolverStatus {
        self.pipeline
            .state
            .status(self.pipeline.config.max_staleness, Utc::now())
    }

    /// Stops the refresh scheduler, cancelling any in-flight fetch, joins
    /// the background task, and releases the held snapshot.
    ///
    /// Idempotent. Every lookup afterwards fails with
    /// [`ResolverError::AlreadyDestroyed`].
    pub async fn destroy(&self) {
        if self.pipeline.state.state() == LifecycleState::Destroyed {
            return;
        }
        self.pipeline.state.set_state(LifecycleState::Destroyed);

        let _ = self.shutdown.send(true);
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        self.pipeline.published.store(None);
        tracing::info!(resolver = %self.pipeline.id, "metadata resolver destroyed");
    }
}

impl std::fmt::Debug for BatchMetadataResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchMetadataResolver")
            .field("id", &self.pipeline.id)
            .field("state", &self.pipeline.state.state())
            .finish_non_exhaustive()
    }
}
