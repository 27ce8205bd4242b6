//! Chains filters together using the builder pattern.

use crate::error::Result;
use crate::traits::Filter;
use crate::types::{Candidate, UserContext};
use tracing::debug;

/// Ordered list of filters applied one after another.
///
/// ```ignore
/// let pipeline = FilterPipeline::new()
///     .add_filter(AlreadySeenFilter)
///     .add_filter(MinimumScoreFilter::new(0.7));
///
/// let survivors = pipeline.apply(candidates, &context)?;
/// ```
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the end of the pipeline
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Apply all filters in sequence
    pub fn apply(&self, candidates: Vec<Candidate>, context: &UserContext) -> Result<Vec<Candidate>> {
        let mut current = candidates;
        for filter in &self.filters {
            let before = current.len();
            current = filter.apply(current, context)?;
            debug!(
                "Filter {} kept {} of {} candidates",
                filter.name(),
                current.len(),
                before
            );
        }
        Ok(current)
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{AlreadySeenFilter, MinimumScoreFilter};
    use crate::types::CandidateSource;

    #[test]
    fn test_empty_pipeline() {
        let pipeline = FilterPipeline::new();
        let context = UserContext::new(1);

        let candidates = vec![
            Candidate::new(1, CandidateSource::Content, 0.9),
            Candidate::new(2, CandidateSource::Content, 0.8),
        ];

        let filtered = pipeline.apply(candidates, &context).unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_chained_filters() {
        let mut context = UserContext::new(1);
        context.seen_listings.insert(1);

        let pipeline = FilterPipeline::new()
            .add_filter(AlreadySeenFilter)
            .add_filter(MinimumScoreFilter::new(0.5));

        let candidates = vec![
            Candidate::new(1, CandidateSource::Content, 0.9),
            Candidate::new(2, CandidateSource::Content, 0.4),
            Candidate::new(3, CandidateSource::Content, 0.5),
        ];

        let filtered = pipeline.apply(candidates, &context).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].listing_id, 3);
    }
}
