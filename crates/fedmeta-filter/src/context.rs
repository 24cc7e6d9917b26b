//! Shared per-cycle filter state.

use std::any::Any;
use std::collections::HashMap;

/// Well-known context keys.
pub mod keys {
    /// Raw bytes of the document being filtered (`Vec<u8>`), seeded by the
    /// resolve pipeline before the chain runs.
    pub const RAW_DOCUMENT: &str = "fedmeta.raw-document";

    /// Identity of the trusted key set that verified the document signature
    /// (`String`), recorded by the signature filter on success.
    pub const VERIFIED_BY: &str = "fedmeta.signature.verified-by";
}

/// A mutable bag of typed key-value side-channel state shared across one
/// filter-chain invocation.
///
/// Scoped to a single resolve cycle and discarded after. Filters use it to
/// pass results downstream, e.g. the signature filter recording which key
/// set verified the document so later filters can make key-scoped
/// decisions.
#[derive(Debug, Default)]
pub struct FilterContext {
    values: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl FilterContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value under a key, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: &'static str, value: T) {
        self.values.insert(key, Box::new(value));
    }

    /// Gets a value by key, if present and of the requested type.
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a value by key.
    pub fn remove<T: Any + Send + Sync>(&mut self, key: &str) -> Option<T> {
        let value = self.values.remove(key)?;
        value.downcast().ok().map(|boxed| *boxed)
    }

    /// Returns true if a value is stored under the key.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_retrieves_typed_values() {
        let mut context = FilterContext::new();
        context.insert(keys::RAW_DOCUMENT, b"<xml/>".to_vec());
        context.insert(keys::VERIFIED_BY, "federation-signing".to_string());

        assert_eq!(
            context.get::<Vec<u8>>(keys::RAW_DOCUMENT).map(Vec::as_slice),
            Some(b"<xml/>".as_slice())
        );
        assert_eq!(
            context.get::<String>(keys::VERIFIED_BY).map(String::as_str),
            Some("federation-signing")
        );
    }

    #[test]
    fn wrong_type_returns_none() {
        let mut context = FilterContext::new();
        context.insert("count", 7u32);

        assert!(context.get::<String>("count").is_none());
        assert_eq!(context.get::<u32>("count"), Some(&7));
    }

    #[test]
    fn remove_takes_ownership() {
        let mut context = FilterContext::new();
        context.insert("marker", true);

        assert_eq!(context.remove::<bool>("marker"), Some(true));
        assert!(!context.contains("marker"));
    }
}
