//! Core traits for candidate filtering.

use crate::error::Result;
use crate::types::{Candidate, UserContext};

/// A composable step that removes candidates.
///
/// Filters take ownership of the candidate list and hand back what
/// survives, so chaining them never clones the whole set.
pub trait Filter: Send + Sync {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &str;

    /// Apply this filter to a set of candidates
    fn apply(&self, candidates: Vec<Candidate>, context: &UserContext) -> Result<Vec<Candidate>>;
}
