//! Filter implementations for the candidate pipeline.

pub mod already_seen;
pub mod minimum_score;

pub use already_seen::AlreadySeenFilter;
pub use minimum_score::MinimumScoreFilter;
