//! Filter trait and chain execution.

use fedmeta_model::MetadataDocument;

use crate::context::FilterContext;
use crate::error::FilterResult;

/// A single trust or hygiene policy applied to a parsed document.
///
/// Returning the document unchanged is a pass; returning a mutated
/// document is a replace; returning an error rejects the whole resolve
/// cycle.
pub trait MetadataFilter: Send + Sync {
    /// Short filter name for logging.
    fn name(&self) -> &'static str;

    /// Applies the policy to the document.
    fn filter(
        &self,
        document: MetadataDocument,
        context: &mut FilterContext,
    ) -> FilterResult<MetadataDocument>;
}

/// An ordered sequence of independent filters.
///
/// Filters execute in configured order; execution stops at the first
/// rejection, so a later filter never re-examines what an earlier one
/// rejected.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn MetadataFilter>>,
}

impl FilterChain {
    /// Creates an empty chain that passes every document through.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter, preserving insertion order.
    #[must_use]
    pub fn with_filter(mut self, filter: impl MetadataFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Appends a boxed filter.
    pub fn push(&mut self, filter: Box<dyn MetadataFilter>) {
        self.filters.push(filter);
    }

    /// Number of filters in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if the chain has no filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Runs the chain over a document.
    ///
    /// ## Errors
    ///
    /// Returns the first rejection produced by a filter; remaining filters
    /// do not run.
    pub fn apply(
        &self,
        mut document: MetadataDocument,
        context: &mut FilterContext,
    ) -> FilterResult<MetadataDocument> {
        for filter in &self.filters {
            match filter.filter(document, context) {
                Ok(filtered) => {
                    tracing::debug!(
                        filter = filter.name(),
                        entities = filtered.entity_count(),
                        "filter passed"
                    );
                    document = filtered;
                }
                Err(rejection) => {
                    tracing::warn!(
                        filter = filter.name(),
                        %rejection,
                        "filter rejected document, aborting cycle"
                    );
                    return Err(rejection);
                }
            }
        }
        Ok(document)
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.filters.iter().map(|filter| filter.name()).collect();
        f.debug_struct("FilterChain").field("filters", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterRejection;
    use fedmeta_model::EntityDescriptor;

    struct TagFilter(&'static str);

    impl MetadataFilter for TagFilter {
        fn name(&self) -> &'static str {
            self.0
        }

        fn filter(
            &self,
            document: MetadataDocument,
            context: &mut FilterContext,
        ) -> FilterResult<MetadataDocument> {
            let mut order = context.remove::<Vec<&'static str>>("order").unwrap_or_default();
            order.push(self.0);
            context.insert("order", order);
            Ok(document)
        }
    }

    struct RejectFilter;

    impl MetadataFilter for RejectFilter {
        fn name(&self) -> &'static str {
            "reject"
        }

        fn filter(
            &self,
            _document: MetadataDocument,
            _context: &mut FilterContext,
        ) -> FilterResult<MetadataDocument> {
            Err(FilterRejection::SignatureMissing)
        }
    }

    fn document() -> MetadataDocument {
        MetadataDocument::group(vec![EntityDescriptor::new("https://idp.example.org")])
    }

    #[test]
    fn filters_run_in_configured_order() {
        let chain = FilterChain::new()
            .with_filter(TagFilter("first"))
            .with_filter(TagFilter("second"))
            .with_filter(TagFilter("third"));

        let mut context = FilterContext::new();
        chain.apply(document(), &mut context).unwrap();

        assert_eq!(
            context.get::<Vec<&'static str>>("order"),
            Some(&vec!["first", "second", "third"])
        );
    }

    #[test]
    fn chain_stops_at_first_rejection() {
        let chain = FilterChain::new()
            .with_filter(TagFilter("first"))
            .with_filter(RejectFilter)
            .with_filter(TagFilter("after"));

        let mut context = FilterContext::new();
        let err = chain.apply(document(), &mut context).unwrap_err();

        assert!(matches!(err, FilterRejection::SignatureMissing));
        assert_eq!(
            context.get::<Vec<&'static str>>("order"),
            Some(&vec!["first"])
        );
    }

    #[test]
    fn empty_chain_passes_through() {
        let chain = FilterChain::new();
        let mut context = FilterContext::new();
        let result = chain.apply(document(), &mut context).unwrap();
        assert_eq!(result.entity_count(), 1);
    }
}
