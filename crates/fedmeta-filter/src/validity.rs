//! Validity window enforcement.

use chrono::{DateTime, Duration, Utc};
use fedmeta_model::MetadataDocument;

use crate::chain::MetadataFilter;
use crate::context::FilterContext;
use crate::error::{FilterRejection, FilterResult};

/// Enforces the document validity window and drops expired entities.
///
/// Two distinct enforcement points, deliberately not conflated:
///
/// 1. **Document-level** (the rejection path): a `validUntil` further out
///    than `now + max_validity` is rejected, as is an absent `validUntil`
///    when one is required. During a resolver's first load this rejection
///    is fatal; during steady-state refresh the scheduler absorbs it and
///    retains the previous snapshot.
/// 2. **Entity-level** (the lenient path): entities whose own `validUntil`
///    has already passed are silently dropped from the result, never an
///    error.
///
/// A zero or negative `max_validity` means no future slack at all: any
/// `validUntil` beyond `now` is rejected, and only already-valid,
/// non-expired entities pass.
#[derive(Debug, Clone)]
pub struct ValidityWindowFilter {
    max_validity: Duration,
    require_valid_until: bool,
}

impl ValidityWindowFilter {
    /// Creates a filter with the given maximum permitted validity interval
    /// from "now".
    #[must_use]
    pub const fn new(max_validity: Duration) -> Self {
        Self {
            max_validity,
            require_valid_until: false,
        }
    }

    /// Requires documents to declare a `validUntil` attribute.
    #[must_use]
    pub const fn require_valid_until(mut self, required: bool) -> Self {
        self.require_valid_until = required;
        self
    }

    fn check_document(
        &self,
        valid_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> FilterResult<()> {
        match valid_until {
            None if self.require_valid_until => Err(FilterRejection::ValidityExceeded(
                "document does not declare validUntil".to_string(),
            )),
            Some(valid_until) if valid_until > now + self.max_validity => {
                Err(FilterRejection::ValidityExceeded(format!(
                    "validUntil {valid_until} exceeds maximum validity interval of {}s",
                    self.max_validity.num_seconds()
                )))
            }
            _ => Ok(()),
        }
    }
}

impl MetadataFilter for ValidityWindowFilter {
    fn name(&self) -> &'static str {
        "validity-window"
    }

    fn filter(
        &self,
        mut document: MetadataDocument,
        _context: &mut FilterContext,
    ) -> FilterResult<MetadataDocument> {
        let now = Utc::now();

        self.check_document(document.valid_until, now)?;

        let before = document.entity_count();
        document.retain_entities(|entity| !entity.is_expired_at(now));
        let dropped = before - document.entity_count();
        if dropped > 0 {
            tracing::debug!(dropped, "dropped expired entities");
        }

        Ok(document)
    }
}
