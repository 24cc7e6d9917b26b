//! Batch-mode resolution scenarios.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fedmeta_filter::{
    EntityRoleFilter, FilterChain, FilterContext, SignatureValidationFilter, ValidityWindowFilter,
};
use fedmeta_model::RoleKind;
use fedmeta_resolver::{BatchMetadataResolver, LifecycleState, ResolverError};
use fedmeta_source::{FilesystemSource, InMemorySource, MetadataSource};

use crate::common::{
    entity_fragment, fast_config, group_document, init_tracing, three_entity_document,
    trusted_keys, AcceptAllVerifier, RejectAllVerifier,
};

/// Signed three-entity document through a signature filter and an IdP
/// role allow-list: iteration yields exactly the IdP-capable entities,
/// each resolvable by ID, and SP role lookups come back empty.
#[tokio::test]
async fn test_end_to_end_idp_scenario() -> anyhow::Result<()> {
    init_tracing();

    let chain = FilterChain::new()
        .with_filter(SignatureValidationFilter::new(
            Arc::new(AcceptAllVerifier),
            trusted_keys(),
        ))
        .with_filter(
            EntityRoleFilter::new(vec![RoleKind::IdentityProvider]).remove_roleless_entities(true),
        );

    let source = Arc::new(InMemorySource::new(three_entity_document(true)));
    let resolver =
        BatchMetadataResolver::new("e2e", fast_config(), source as Arc<dyn MetadataSource>, chain)?;
    resolver.initialize().await?;

    let ids: HashSet<String> = resolver
        .iterate()?
        .map(|entity| entity.entity_id.clone())
        .collect();
    let expected: HashSet<String> = ["https://idp.example.org", "https://both.example.org"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(ids, expected, "only IdP-capable entities survive");

    for id in &expected {
        let entity = resolver.resolve_by_id(id)?.expect("entity resolvable by ID");
        assert!(entity.has_role(RoleKind::IdentityProvider));
        assert!(
            resolver.resolve_by_role(id, RoleKind::ServiceProvider)?.is_empty(),
            "SP roles must not survive the allow-list"
        );
    }

    assert!(resolver.resolve_by_id("https://sp.example.org")?.is_none());

    resolver.destroy().await;
    Ok(())
}

/// Without `remove_roleless_entities`, an entity stripped of all roles is
/// still resolvable by ID but yields no role descriptors.
#[tokio::test]
async fn test_role_filter_keeps_roleless_entities_by_default() -> anyhow::Result<()> {
    init_tracing();

    let chain =
        FilterChain::new().with_filter(EntityRoleFilter::new(vec![RoleKind::IdentityProvider]));
    let source = Arc::new(InMemorySource::new(three_entity_document(false)));
    let resolver = BatchMetadataResolver::new(
        "roleless",
        fast_config(),
        source as Arc<dyn MetadataSource>,
        chain,
    )?;
    resolver.initialize().await?;

    let sp = resolver
        .resolve_by_id("https://sp.example.org")?
        .expect("SP-only entity still present");
    assert!(sp.roles.is_empty());
    assert!(resolver
        .resolve_by_role("https://sp.example.org", RoleKind::ServiceProvider)?
        .is_empty());

    resolver.destroy().await;
    Ok(())
}

#[tokio::test]
async fn test_unsigned_document_fails_initialization() -> anyhow::Result<()> {
    init_tracing();

    let chain = FilterChain::new().with_filter(SignatureValidationFilter::new(
        Arc::new(AcceptAllVerifier),
        trusted_keys(),
    ));
    let source = Arc::new(InMemorySource::new(three_entity_document(false)));
    let resolver = BatchMetadataResolver::new(
        "unsigned",
        fast_config(),
        source as Arc<dyn MetadataSource>,
        chain,
    )?;

    let err = resolver.initialize().await.unwrap_err();
    assert!(matches!(err, ResolverError::InitializationFailed(_)));
    assert_eq!(resolver.status().state, LifecycleState::Failed);
    Ok(())
}

#[tokio::test]
async fn test_invalid_signature_fails_initialization() -> anyhow::Result<()> {
    init_tracing();

    let chain = FilterChain::new().with_filter(SignatureValidationFilter::new(
        Arc::new(RejectAllVerifier),
        trusted_keys(),
    ));
    let source = Arc::new(InMemorySource::new(three_entity_document(true)));
    let resolver = BatchMetadataResolver::new(
        "badsig",
        fast_config(),
        source as Arc<dyn MetadataSource>,
        chain,
    )?;

    let err = resolver.initialize().await.unwrap_err();
    assert!(matches!(err, ResolverError::InitializationFailed(_)));
    Ok(())
}

/// The fail-open invariant: after a successful load, a refresh failure
/// leaves every previously-present entity resolvable, and the status
/// reports the failure and staleness.
#[tokio::test]
async fn test_fail_open_on_refresh_failure() -> anyhow::Result<()> {
    init_tracing();

    let source = Arc::new(InMemorySource::new(three_entity_document(false)));
    let config = fast_config().with_max_staleness(Some(Duration::from_millis(50)));
    let resolver = BatchMetadataResolver::new(
        "fail-open",
        config,
        Arc::clone(&source) as Arc<dyn MetadataSource>,
        FilterChain::new(),
    )?;
    resolver.initialize().await?;

    let before: HashSet<String> = resolver
        .iterate()?
        .map(|entity| entity.entity_id.clone())
        .collect();
    assert_eq!(before.len(), 3);

    // Break the origin and wait for the scheduler to hit it.
    source.set_bytes(b"<<< definitely not metadata >>>".as_slice());
    tokio::time::sleep(Duration::from_millis(250)).await;

    let after: HashSet<String> = resolver
        .iterate()?
        .map(|entity| entity.entity_id.clone())
        .collect();
    assert_eq!(before, after, "readers must see the previous snapshot unchanged");

    for id in &before {
        assert!(resolver.resolve_by_id(id)?.is_some());
    }

    let status = resolver.status();
    assert_eq!(status.state, LifecycleState::Active);
    assert!(status.consecutive_failures >= 1);
    assert!(status.last_failure.is_some());
    assert!(status.stale, "staleness policy must report aged data");

    resolver.destroy().await;
    Ok(())
}

/// Concurrent readers during refresh must never observe a snapshot mixing
/// old and new contents.
#[tokio::test]
async fn test_atomic_snapshot_publish() -> anyhow::Result<()> {
    init_tracing();

    let two = group_document(
        &[
            entity_fragment("https://a.example.org", &["idp"]),
            entity_fragment("https://b.example.org", &["idp"]),
        ],
        false,
        "",
    );
    let three = group_document(
        &[
            entity_fragment("https://c.example.org", &["idp"]),
            entity_fragment("https://d.example.org", &["idp"]),
            entity_fragment("https://e.example.org", &["idp"]),
        ],
        false,
        "",
    );

    let source = Arc::new(InMemorySource::new(two));
    let resolver = Arc::new(BatchMetadataResolver::new(
        "atomic",
        fast_config(),
        Arc::clone(&source) as Arc<dyn MetadataSource>,
        FilterChain::new(),
    )?);
    resolver.initialize().await?;

    let mut readers = Vec::new();
    for _ in 0..4 {
        let resolver = Arc::clone(&resolver);
        readers.push(tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + Duration::from_millis(300);
            while tokio::time::Instant::now() < deadline {
                let ids: Vec<String> = resolver
                    .iterate()
                    .expect("resolver active")
                    .map(|entity| entity.entity_id.clone())
                    .collect();
                let old = ids.iter().any(|id| id.starts_with("https://a") || id.starts_with("https://b"));
                let new = ids.iter().any(|id| id.starts_with("https://c"));
                assert!(
                    !(old && new),
                    "torn read: snapshot mixes generations: {ids:?}"
                );
                assert!(ids.len() == 2 || ids.len() == 3, "unexpected entity count: {ids:?}");
                tokio::task::yield_now().await;
            }
        }));
    }

    tokio::time::sleep(Duration::from_millis(60)).await;
    source.set_bytes(three);

    for reader in readers {
        reader.await?;
    }

    // The refresh eventually published the new generation.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(resolver.resolve_by_id("https://c.example.org")?.is_some());

    resolver.destroy().await;
    Ok(())
}

/// Duplicate entity IDs abort the cycle instead of silently merging.
#[tokio::test]
async fn test_duplicate_entity_id_rejected() -> anyhow::Result<()> {
    init_tracing();

    let doc = group_document(
        &[
            entity_fragment("https://dup.example.org", &["idp"]),
            entity_fragment("https://dup.example.org", &["sp"]),
        ],
        false,
        "",
    );
    let source = Arc::new(InMemorySource::new(doc));
    let resolver = BatchMetadataResolver::new(
        "dup",
        fast_config(),
        source as Arc<dyn MetadataSource>,
        FilterChain::new(),
    )?;

    let err = resolver.initialize().await.unwrap_err();
    assert!(matches!(err, ResolverError::InitializationFailed(message) if message.contains("duplicate")));
    Ok(())
}

/// Validity enforcement is asymmetric: a future `validUntil` beyond the
/// window is fatal at initialization, while an already-expired entity is
/// silently omitted after initialization.
#[tokio::test]
async fn test_validity_enforcement_asymmetry() -> anyhow::Result<()> {
    init_tracing();

    // Initialization: zero max validity, validUntil ten seconds out.
    let valid_until = (Utc::now() + chrono::Duration::seconds(10))
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string();
    let doc = group_document(
        &[entity_fragment("https://idp.example.org", &["idp"])],
        false,
        &format!(r#"validUntil="{valid_until}""#),
    );
    let chain =
        FilterChain::new().with_filter(ValidityWindowFilter::new(chrono::Duration::zero()));
    let source = Arc::new(InMemorySource::new(doc));
    let resolver = BatchMetadataResolver::new(
        "validity-init",
        fast_config(),
        source as Arc<dyn MetadataSource>,
        chain,
    )?;

    let err = resolver.initialize().await.unwrap_err();
    assert!(matches!(err, ResolverError::InitializationFailed(_)));

    // Steady state: filtering an already-expired entity drops it quietly.
    let mut expired = fedmeta_model::parse_metadata(
        group_document(
            &[entity_fragment("https://expired.example.org", &["idp"])],
            false,
            "",
        )
        .as_bytes(),
    )?;
    expired
        .entities_mut()
        .for_each(|entity| entity.valid_until = Some(Utc::now() - chrono::Duration::hours(1)));

    let filter = ValidityWindowFilter::new(chrono::Duration::zero());
    let filtered = fedmeta_filter::MetadataFilter::filter(
        &filter,
        expired,
        &mut FilterContext::new(),
    )?;
    assert!(filtered.is_empty(), "expired entity is omitted, not an error");

    Ok(())
}

/// A filesystem-backed resolver: write, load, resolve.
#[tokio::test]
async fn test_filesystem_source_end_to_end() -> anyhow::Result<()> {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("federation.xml");
    std::fs::write(&path, three_entity_document(false))?;

    let source = Arc::new(FilesystemSource::new(&path));
    let resolver = BatchMetadataResolver::new(
        "filesystem",
        fast_config(),
        source as Arc<dyn MetadataSource>,
        FilterChain::new(),
    )?;
    resolver.initialize().await?;

    assert!(resolver.resolve_by_id("https://idp.example.org")?.is_some());
    assert_eq!(resolver.iterate()?.count(), 3);

    resolver.destroy().await;
    Ok(())
}
