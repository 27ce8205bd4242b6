//! Filter to drop candidates below a score threshold.

use crate::error::Result;
use crate::traits::Filter;
use crate::types::{Candidate, UserContext};

/// Keeps candidates with `score >= threshold`
pub struct MinimumScoreFilter {
    threshold: f32,
}

impl MinimumScoreFilter {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Filter for MinimumScoreFilter {
    fn name(&self) -> &str {
        "MinimumScoreFilter"
    }

    fn apply(&self, candidates: Vec<Candidate>, _context: &UserContext) -> Result<Vec<Candidate>> {
        Ok(candidates
            .into_iter()
            .filter(|candidate| candidate.score >= self.threshold)
            .collect())
    }
}
