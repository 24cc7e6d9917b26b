//! Document signature enforcement.

use std::sync::Arc;

use fedmeta_model::MetadataDocument;

use crate::chain::MetadataFilter;
use crate::context::{keys, FilterContext};
use crate::error::{FilterRejection, FilterResult};

/// A named set of trusted keys.
///
/// Key material is opaque to this crate (DER blobs consumed by the
/// verifier capability); it is read-only input, safely shared across
/// resolvers and refresh cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedKeySet {
    id: String,
    keys: Vec<Vec<u8>>,
}

impl TrustedKeySet {
    /// Creates a key set with the given identity and key blobs.
    #[must_use]
    pub fn new(id: impl Into<String>, keys: Vec<Vec<u8>>) -> Self {
        Self { id: id.into(), keys }
    }

    /// The key set identity, recorded in the filter context on successful
    /// verification.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The key blobs.
    #[must_use]
    pub fn keys(&self) -> &[Vec<u8>] {
        &self.keys
    }

    /// Number of keys in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the set holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// External signature verification capability.
///
/// The filter chain never implements signature math itself; an
/// implementation of this trait (XML-DSig, or a test fake) is supplied at
/// construction time.
pub trait SignatureVerifier: Send + Sync {
    /// Verifies the signature over the raw document bytes against a
    /// trusted key set.
    fn verify(&self, document: &[u8], trusted_keys: &TrustedKeySet) -> bool;
}

/// Verifies the document-level signature against configured trusted keys.
///
/// Rejects when a signature is required but missing, or present but
/// invalid. On success the trusted key set identity is recorded under
/// [`keys::VERIFIED_BY`] for downstream filters.
pub struct SignatureValidationFilter {
    verifier: Arc<dyn SignatureVerifier>,
    trusted_keys: Arc<TrustedKeySet>,
    require_signed: bool,
}

impl SignatureValidationFilter {
    /// Creates a filter requiring a valid signature.
    #[must_use]
    pub fn new(verifier: Arc<dyn SignatureVerifier>, trusted_keys: Arc<TrustedKeySet>) -> Self {
        Self {
            verifier,
            trusted_keys,
            require_signed: true,
        }
    }

    /// Controls whether an unsigned document is rejected. When signatures
    /// are optional, unsigned documents pass through unverified.
    #[must_use]
    pub const fn require_signed(mut self, required: bool) -> Self {
        self.require_signed = required;
        self
    }
}

impl MetadataFilter for SignatureValidationFilter {
    fn name(&self) -> &'static str {
        "signature-validation"
    }

    fn filter(
        &self,
        document: MetadataDocument,
        context: &mut FilterContext,
    ) -> FilterResult<MetadataDocument> {
        let raw = match context.get::<Vec<u8>>(keys::RAW_DOCUMENT) {
            Some(bytes) if is_signed(bytes) => bytes.clone(),
            _ => {
                if self.require_signed {
                    return Err(FilterRejection::SignatureMissing);
                }
                return Ok(document);
            }
        };

        if self.verifier.verify(&raw, &self.trusted_keys) {
            context.insert(keys::VERIFIED_BY, self.trusted_keys.id().to_string());
            Ok(document)
        } else {
            Err(FilterRejection::SignatureInvalid(format!(
                "signature did not verify against key set '{}'",
                self.trusted_keys.id()
            )))
        }
    }
}

/// Lightweight check for the presence of an enveloped signature element.
fn is_signed(xml: &[u8]) -> bool {
    contains(xml, b"<Signature") || contains(xml, b"<ds:Signature")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
