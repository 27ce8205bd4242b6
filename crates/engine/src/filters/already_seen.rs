//! Filter to remove listings the user has already interacted with.

use crate::error::Result;
use crate::traits::Filter;
use crate::types::{Candidate, UserContext};

/// Removes candidates found in `UserContext::seen_listings`
pub struct AlreadySeenFilter;

impl Filter for AlreadySeenFilter {
    fn name(&self) -> &str {
        "AlreadySeenFilter"
    }

    fn apply(&self, candidates: Vec<Candidate>, context: &UserContext) -> Result<Vec<Candidate>> {
        Ok(candidates
            .into_iter()
            .filter(|candidate| !context.seen_listings.contains(&candidate.listing_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CandidateSource;

    #[test]
    fn test_already_seen_filter() {
        let mut context = UserContext::new(1);
        context.seen_listings.insert(100);
        context.seen_listings.insert(200);

        let candidates = vec![
            Candidate::new(100, CandidateSource::UserBased, 0.9),
            Candidate::new(101, CandidateSource::UserBased, 0.8),
            Candidate::new(200, CandidateSource::ItemBased, 0.7),
            Candidate::new(300, CandidateSource::ItemBased, 0.6),
        ];

        let filtered = AlreadySeenFilter.apply(candidates, &context).unwrap();

        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].listing_id, 101);
        assert_eq!(filtered[1].listing_id, 300);
    }
}
