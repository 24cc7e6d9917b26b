//! Common test utilities and fixtures.

use std::sync::Arc;
use std::time::Duration;

use fedmeta_filter::{SignatureVerifier, TrustedKeySet};
use fedmeta_resolver::ResolverConfig;

/// Initializes tracing for tests. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("fedmeta_resolver=debug,fedmeta_filter=debug")
        .try_init();
}

/// Resolver config with delays small enough for test-speed refreshes.
pub fn fast_config() -> ResolverConfig {
    ResolverConfig::new()
        .with_min_refresh_delay(Duration::from_millis(20))
        .with_max_refresh_delay(Duration::from_millis(40))
        .with_backoff(Duration::from_millis(20), Duration::from_millis(100))
        .with_expiration_safety_margin(Duration::from_millis(10))
}

/// Verifier that accepts any document signed by the expected key set.
pub struct AcceptAllVerifier;

impl SignatureVerifier for AcceptAllVerifier {
    fn verify(&self, _document: &[u8], _trusted_keys: &TrustedKeySet) -> bool {
        true
    }
}

/// Verifier that rejects everything.
pub struct RejectAllVerifier;

impl SignatureVerifier for RejectAllVerifier {
    fn verify(&self, _document: &[u8], _trusted_keys: &TrustedKeySet) -> bool {
        false
    }
}

/// A trusted key set fixture.
pub fn trusted_keys() -> Arc<TrustedKeySet> {
    Arc::new(TrustedKeySet::new("federation-signing", vec![vec![0x01, 0x02]]))
}

/// An `EntityDescriptor` fragment with the given roles.
pub fn entity_fragment(entity_id: &str, roles: &[&str]) -> String {
    let roles: String = roles
        .iter()
        .map(|role| match *role {
            "idp" => format!(
                r#"<IDPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
                     <SingleSignOnService
                         Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect"
                         Location="{entity_id}/sso"/>
                   </IDPSSODescriptor>"#
            ),
            "sp" => format!(
                r#"<SPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
                     <AssertionConsumerService
                         Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST"
                         Location="{entity_id}/acs" index="0"/>
                   </SPSSODescriptor>"#
            ),
            other => panic!("unknown role fixture '{other}'"),
        })
        .collect();

    format!(r#"<EntityDescriptor entityID="{entity_id}">{roles}</EntityDescriptor>"#)
}

/// An `EntitiesDescriptor` document around the given entity fragments.
pub fn group_document(entities: &[String], signed: bool, attrs: &str) -> String {
    let signature = if signed {
        r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">sig</ds:Signature>"#
    } else {
        ""
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<EntitiesDescriptor xmlns="urn:oasis:names:tc:SAML:2.0:metadata" {attrs}>{signature}{}</EntitiesDescriptor>"#,
        entities.join("")
    )
}

/// A three-entity federation: one IdP, one SP-only, one with both roles.
pub fn three_entity_document(signed: bool) -> String {
    group_document(
        &[
            entity_fragment("https://idp.example.org", &["idp"]),
            entity_fragment("https://sp.example.org", &["sp"]),
            entity_fragment("https://both.example.org", &["idp", "sp"]),
        ],
        signed,
        "",
    )
}
