//! Dynamic (on-demand) resolver facade.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fedmeta_filter::{keys, FilterChain, FilterContext};
use fedmeta_model::{parse_metadata, EntityDescriptor, RoleDescriptor, RoleKind};
use fedmeta_source::{EntitySource, FetchOutcome};

use crate::config::ResolverConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::snapshot::{build_snapshot, SnapshotIter};
use crate::state::{LifecycleState, ResolverStatus, StateCell};

#[derive(Debug, Clone)]
struct CachedEntity {
    descriptor: Arc<EntityDescriptor>,
    expires_at: DateTime<Utc>,
}

/// Resolves entities lazily, one at a time, caching each with its own
/// derived expiry.
///
/// A cache miss triggers a per-entity fetch which is parsed, filtered,
/// and indexed like any other document. Not-found results are remembered
/// in a negative cache for a short TTL so repeated lookups of the same
/// unknown ID do not hammer the origin. Resolve cycles for one resolver
/// are serialized; cached reads are lock-free.
pub struct DynamicMetadataResolver {
    id: String,
    config: ResolverConfig,
    source: Arc<dyn EntitySource>,
    chain: Arc<FilterChain>,
    state: StateCell,
    cache: DashMap<String, CachedEntity>,
    negative: DashMap<String, DateTime<Utc>>,
    resolve_lock: tokio::sync::Mutex<()>,
}

impl DynamicMetadataResolver {
    /// Creates a resolver. Nothing is prefetched.
    ///
    /// ## Errors
    ///
    /// Returns [`ResolverError::InitializationFailed`] for an inconsistent
    /// configuration.
    pub fn new(
        id: impl Into<String>,
        config: ResolverConfig,
        source: Arc<dyn EntitySource>,
        chain: FilterChain,
    ) -> ResolverResult<Self> {
        config.validate()?;
        Ok(Self {
            id: id.into(),
            config,
            source,
            chain: Arc::new(chain),
            state: StateCell::new(),
            cache: DashMap::new(),
            negative: DashMap::new(),
            resolve_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// The resolver identifier, used in logs.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Activates the resolver. There is no initial load in dynamic mode.
    ///
    /// ## Errors
    ///
    /// Returns [`ResolverError::AlreadyDestroyed`] after `destroy`.
    pub fn initialize(&self) -> ResolverResult<()> {
        match self.state.state() {
            LifecycleState::Destroyed => Err(ResolverError::AlreadyDestroyed),
            _ => {
                self.state.set_state(LifecycleState::Active);
                Ok(())
            }
        }
    }

    /// Resolves an entity, fetching it on a cache miss.
    ///
    /// ## Errors
    ///
    /// Lifecycle errors, plus fetch/parse/filter failures when the entity
    /// is not cached and the origin cycle fails. An expired cache entry
    /// whose re-fetch fails is served stale instead (fail-open).
    pub async fn resolve_by_id(
        &self,
        entity_id: &str,
    ) -> ResolverResult<Option<Arc<EntityDescriptor>>> {
        self.state.ensure_readable()?;

        let now = Utc::now();
        if let Some(hit) = self.cached(entity_id, now) {
            return Ok(Some(hit));
        }
        if self.negative_hit(entity_id, now) {
            return Ok(None);
        }

        // One resolve cycle at a time per resolver.
        let _serialized = self.resolve_lock.lock().await;
        self.state.ensure_readable()?;

        let now = Utc::now();
        if let Some(hit) = self.cached(entity_id, now) {
            return Ok(Some(hit));
        }
        if self.negative_hit(entity_id, now) {
            return Ok(None);
        }

        match self.fetch_and_cache(entity_id, now).await {
            Ok(resolved) => Ok(resolved),
            Err(error) => {
                // Fail-open: an expired entry beats a failed refresh.
                if let Some(stale) = self.cache.get(entity_id) {
                    self.state.record_failure(now, error.to_string());
                    tracing::warn!(
                        resolver = %self.id,
                        %entity_id,
                        %error,
                        "per-entity refresh failed; serving stale entry"
                    );
                    Ok(Some(Arc::clone(&stale.descriptor)))
                } else {
                    Err(error)
                }
            }
        }
    }

    /// Role descriptors of the given kind for an entity.
    ///
    /// ## Errors
    ///
    /// Same as [`resolve_by_id`](Self::resolve_by_id).
    pub async fn resolve_by_role(
        &self,
        entity_id: &str,
        kind: RoleKind,
    ) -> ResolverResult<Vec<RoleDescriptor>> {
        let descriptor = self.resolve_by_id(entity_id).await?;
        Ok(descriptor
            .map(|entity| entity.roles_of_kind(kind).cloned().collect())
            .unwrap_or_default())
    }

    /// Iterates the currently cached, unexpired entities.
    ///
    /// ## Errors
    ///
    /// Fails only for lifecycle reasons.
    pub fn iterate(&self) -> ResolverResult<SnapshotIter> {
        self.state.ensure_readable()?;
        let now = Utc::now();
        let mut entities: Vec<_> = self
            .cache
            .iter()
            .filter(|entry| entry.expires_at > now)
            .map(|entry| Arc::clone(&entry.descriptor))
            .collect();
        entities.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        Ok(SnapshotIter::new(entities))
    }

    /// Current lifecycle and staleness report.
    #[must_use]
    pub fn status(&self) -> ResolverStatus {
        self.state.status(self.config.max_staleness, Utc::now())
    }

    /// Waits out any in-flight resolve cycle, then drops the caches.
    ///
    /// Idempotent. Every lookup afterwards fails with
    /// [`ResolverError::AlreadyDestroyed`].
    pub async fn destroy(&self) {
        if self.state.state() == LifecycleState::Destroyed {
            return;
        }
        self.state.set_state(LifecycleState::Destroyed);

        let _serialized = self.resolve_lock.lock().await;
        self.cache.clear();
        self.negative.clear();
        tracing::info!(resolver = %self.id, "metadata resolver destroyed");
    }

    fn cached(&self, entity_id: &str, now: DateTime<Utc>) -> Option<Arc<EntityDescriptor>> {
        self.cache
            .get(entity_id)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| Arc::clone(&entry.descriptor))
    }

    fn negative_hit(&self, entity_id: &str, now: DateTime<Utc>) -> bool {
        self.negative
            .get(entity_id)
            .is_some_and(|expires_at| *expires_at > now)
    }

    fn remember_not_found(&self, entity_id: &str, now: DateTime<Utc>) {
        let ttl = chrono::Duration::from_std(self.config.negative_cache_ttl)
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.negative.insert(entity_id.to_string(), now + ttl);
    }

    async fn fetch_and_cache(
        &self,
        entity_id: &str,
        now: DateTime<Utc>,
    ) -> ResolverResult<Option<Arc<EntityDescriptor>>> {
        let outcome = match self.source.fetch_entity(entity_id).await {
            Ok(outcome) => outcome,
            Err(error) if error.is_not_found() => {
                tracing::debug!(resolver = %self.id, %entity_id, "entity not found, caching negatively");
                self.remember_not_found(entity_id, now);
                return Ok(None);
            }
            Err(error) => return Err(error.into()),
        };

        let bytes = match outcome {
            FetchOutcome::Document { bytes, .. } => bytes,
            // Per-entity sources carry no conditional tokens; an unchanged
            // answer here means the origin had nothing for us.
            FetchOutcome::Unchanged => {
                self.remember_not_found(entity_id, now);
                return Ok(None);
            }
        };

        let document = parse_metadata(&bytes)?;

        let mut context = FilterContext::new();
        context.insert(keys::RAW_DOCUMENT, bytes);
        let document = self.chain.apply(document, &mut context)?;

        let cache_hint = document.cache_duration;
        let doc_valid_until = document.valid_until;
        let snapshot = build_snapshot(document, now)?;

        match snapshot.entity(entity_id) {
            Some(descriptor) => {
                let valid_until = match (doc_valid_until, descriptor.valid_until) {
                    (Some(doc), Some(entity)) => Some(doc.min(entity)),
                    (doc, entity) => doc.or(entity),
                };
                let expires_at = self.entry_expiry(cache_hint, valid_until, now);
                self.cache.insert(
                    entity_id.to_string(),
                    CachedEntity {
                        descriptor: Arc::clone(&descriptor),
                        expires_at,
                    },
                );
                self.state.record_success(now);
                tracing::debug!(
                    resolver = %self.id,
                    %entity_id,
                    %expires_at,
                    "cached dynamically resolved entity"
                );
                Ok(Some(descriptor))
            }
            None => {
                // Fetched fine, but the document did not contain (or the
                // filters dropped) the requested entity.
                self.remember_not_found(entity_id, now);
                Ok(None)
            }
        }
    }

    /// Per-entry expiry: `now + clamp(cacheDuration, min_refresh_delay,
    /// max_cache_duration)`, capped by the declared `validUntil`.
    fn entry_expiry(
        &self,
        cache_hint: Option<std::time::Duration>,
        valid_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let base = cache_hint
            .unwrap_or(self.config.max_cache_duration)
            .clamp(self.config.min_refresh_delay, self.config.max_cache_duration);
        let mut expires_at = now
            + chrono::Duration::from_std(base)
                .unwrap_or_else(|_| chrono::Duration::days(1));
        if let Some(valid_until) = valid_until {
            expires_at = expires_at.min(valid_until);
        }
        expires_at
    }
}

impl std::fmt::Debug for DynamicMetadataResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicMetadataResolver")
            .field("id", &self.id)
            .field("state", &self.state.state())
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}
