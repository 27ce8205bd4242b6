//! Similarity metrics.
//!
//! Every metric returns 0 instead of dividing by zero, so callers never
//! have to special-case empty or all-zero inputs.

use crate::error::{EngineError, Result};
use std::collections::HashSet;
use std::hash::Hash;

/// Cosine similarity between two equal-length vectors, in [-1, 1].
///
/// Returns 0.0 if either vector has zero magnitude. Vectors of different
/// lengths are compared over their common prefix.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Cosine similarity that rejects vectors of different lengths
pub fn checked_cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EngineError::DimensionMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    Ok(cosine_similarity(a, b))
}

/// Jaccard similarity = |intersection| / |union|, in [0, 1]
pub fn jaccard_similarity<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f32 {
    let intersection = a.intersection(b).count() as f32;
    let union = (a.len() + b.len()) as f32 - intersection;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Element-wise mean of equal-length vectors, `None` for an empty input
pub fn mean_vector<'a>(vectors: impl IntoIterator<Item = &'a [f32]>) -> Option<Vec<f32>> {
    let mut sum: Option<Vec<f32>> = None;
    let mut count = 0usize;
    for vector in vectors {
        match sum.as_mut() {
            Some(acc) => acc.iter_mut().zip(vector).for_each(|(s, v)| *s += v),
            None => sum = Some(vector.to_vec()),
        }
        count += 1;
    }
    sum.map(|mut acc| {
        acc.iter_mut().for_each(|s| *s /= count as f32);
        acc
    })
}
