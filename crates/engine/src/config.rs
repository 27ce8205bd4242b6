//! Tuning knobs shared by the recommendation engines.
//!
//! None of these are correctness requirements. They trade precision
//! against recall and can be overridden from a config file, since every
//! field falls back to its default when absent.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum cosine similarity for a content-based match
    pub similarity_threshold: f32,

    /// Max weight difference for two users to "agree" on a shared listing
    pub agreement_tolerance: u8,

    /// Item pairs at or below this similarity don't contribute to a score
    pub min_item_similarity: f32,

    /// Share of item similarity coming from rater-set overlap (Jaccard)
    pub jaccard_weight: f32,

    /// Share of item similarity coming from rating agreement
    pub rating_agreement_weight: f32,

    /// Share of the item-based score taken from neighbours; the rest is popularity
    pub score_blend: f32,

    /// Minimum interaction count for a listing to qualify as a popularity fallback
    pub min_popularity_interactions: usize,

    /// Fill the item-pair similarity cache in parallel on every reload
    pub precompute_item_similarities: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            agreement_tolerance: 1,
            min_item_similarity: 0.1,
            jaccard_weight: 0.4,
            rating_agreement_weight: 0.6,
            score_blend: 0.7,
            min_popularity_interactions: 2,
            precompute_item_similarities: false,
        }
    }
}

impl EngineConfig {
    /// Configure the content similarity threshold (default: 0.7)
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Configure the user agreement tolerance (default: 1)
    pub fn with_agreement_tolerance(mut self, tolerance: u8) -> Self {
        self.agreement_tolerance = tolerance;
        self
    }

    /// Configure the minimum contributing item similarity (default: 0.1)
    pub fn with_min_item_similarity(mut self, min: f32) -> Self {
        self.min_item_similarity = min;
        self
    }

    /// Configure the neighbour/popularity blend for item-based scores (default: 0.7)
    pub fn with_score_blend(mut self, blend: f32) -> Self {
        self.score_blend = blend;
        self
    }

    /// Configure the popularity fallback's minimum interaction count (default: 2)
    pub fn with_min_popularity_interactions(mut self, count: usize) -> Self {
        self.min_popularity_interactions = count;
        self
    }

    /// Warm the item similarity cache on reload (default: off)
    pub fn with_precomputed_item_similarities(mut self, enabled: bool) -> Self {
        self.precompute_item_similarities = enabled;
        self
    }
}
