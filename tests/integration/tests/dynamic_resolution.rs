//! Dynamic (on-demand) resolution scenarios.

use std::sync::Arc;
use std::time::Duration;

use fedmeta_filter::{EntityRoleFilter, FilterChain};
use fedmeta_model::RoleKind;
use fedmeta_resolver::{DynamicMetadataResolver, ResolverError};
use fedmeta_source::{EntitySource, InMemoryEntitySource};

use crate::common::{entity_fragment, fast_config, init_tracing};

fn single_entity_document(entity_id: &str, roles: &[&str]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>{}"#,
        entity_fragment(entity_id, roles)
    )
}

/// Two lookups for an unknown ID within the negative-cache TTL trigger one
/// fetch; a third after expiry triggers a second.
#[tokio::test]
async fn test_negative_cache_ttl() -> anyhow::Result<()> {
    init_tracing();

    let source = Arc::new(InMemoryEntitySource::new());
    let config = fast_config().with_negative_cache_ttl(Duration::from_millis(60));
    let resolver = DynamicMetadataResolver::new(
        "negative-ttl",
        config,
        Arc::clone(&source) as Arc<dyn EntitySource>,
        FilterChain::new(),
    )?;
    resolver.initialize()?;

    assert!(resolver.resolve_by_id("https://missing.example.org").await?.is_none());
    assert!(resolver.resolve_by_id("https://missing.example.org").await?.is_none());
    assert_eq!(source.fetch_count(), 1, "second miss is served by the negative cache");

    tokio::time::sleep(Duration::from_millis(120)).await;

    assert!(resolver.resolve_by_id("https://missing.example.org").await?.is_none());
    assert_eq!(source.fetch_count(), 2, "expired negative entry allows a re-fetch");

    resolver.destroy().await;
    Ok(())
}

/// On-demand fetch, filter, and cache of a single entity.
#[tokio::test]
async fn test_dynamic_lookup_caches_entity() -> anyhow::Result<()> {
    init_tracing();

    let source = Arc::new(InMemoryEntitySource::new());
    source.insert(
        "https://idp.example.org",
        single_entity_document("https://idp.example.org", &["idp"]),
    );

    let resolver = DynamicMetadataResolver::new(
        "dynamic",
        fast_config(),
        Arc::clone(&source) as Arc<dyn EntitySource>,
        FilterChain::new(),
    )?;
    resolver.initialize()?;

    let entity = resolver
        .resolve_by_id("https://idp.example.org")
        .await?
        .expect("entity resolved on demand");
    assert!(entity.has_role(RoleKind::IdentityProvider));

    resolver.resolve_by_id("https://idp.example.org").await?;
    assert_eq!(source.fetch_count(), 1, "repeat lookup hits the cache");

    let roles = resolver
        .resolve_by_role("https://idp.example.org", RoleKind::IdentityProvider)
        .await?;
    assert_eq!(roles.len(), 1);

    let ids: Vec<String> = resolver.iterate()?.map(|e| e.entity_id.clone()).collect();
    assert_eq!(ids, vec!["https://idp.example.org"]);

    resolver.destroy().await;
    Ok(())
}

/// A role filter dropping every role of the fetched entity turns the
/// lookup into a miss when roleless entities are removed.
#[tokio::test]
async fn test_dynamic_resolution_respects_role_filter() -> anyhow::Result<()> {
    init_tracing();

    let source = Arc::new(InMemoryEntitySource::new());
    source.insert(
        "https://sp.example.org",
        single_entity_document("https://sp.example.org", &["sp"]),
    );

    let chain = FilterChain::new().with_filter(
        EntityRoleFilter::new(vec![RoleKind::IdentityProvider]).remove_roleless_entities(true),
    );
    let resolver = DynamicMetadataResolver::new(
        "dynamic-filtered",
        fast_config(),
        Arc::clone(&source) as Arc<dyn EntitySource>,
        chain,
    )?;
    resolver.initialize()?;

    assert!(
        resolver.resolve_by_id("https://sp.example.org").await?.is_none(),
        "filtered-out entity resolves to nothing"
    );

    // The miss is negatively cached.
    resolver.resolve_by_id("https://sp.example.org").await?;
    assert_eq!(source.fetch_count(), 1);

    resolver.destroy().await;
    Ok(())
}

#[tokio::test]
async fn test_dynamic_destroy_blocks_lookups() -> anyhow::Result<()> {
    init_tracing();

    let source = Arc::new(InMemoryEntitySource::new());
    let resolver = DynamicMetadataResolver::new(
        "dynamic-destroy",
        fast_config(),
        source as Arc<dyn EntitySource>,
        FilterChain::new(),
    )?;
    resolver.initialize()?;
    resolver.destroy().await;

    assert!(matches!(
        resolver.resolve_by_id("https://idp.example.org").await,
        Err(ResolverError::AlreadyDestroyed)
    ));
    Ok(())
}
