//! Final ordering of candidates.

use crate::types::Candidate;

/// Sort by score descending, break ties by listing id ascending, keep `top_n`.
///
/// NaN scores rank last.
pub fn rank_top_n(mut candidates: Vec<Candidate>, top_n: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        sort_key(b.score)
            .total_cmp(&sort_key(a.score))
            .then_with(|| a.listing_id.cmp(&b.listing_id))
    });
    candidates.truncate(top_n);
    candidates
}

fn sort_key(score: f32) -> f32 {
    if score.is_nan() { f32::NEG_INFINITY } else { score }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CandidateSource;

    #[test]
    fn test_sorts_descending_with_id_tiebreak() {
        let candidates = vec![
            Candidate::new(3, CandidateSource::Content, 0.5),
            Candidate::new(1, CandidateSource::Content, 0.9),
            Candidate::new(2, CandidateSource::Content, 0.5),
        ];
        let ranked = rank_top_n(candidates, 10);
        let ids: Vec<_> = ranked.iter().map(|c| c.listing_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_truncates_to_top_n() {
        let candidates = (1..=5)
            .map(|id| Candidate::new(id, CandidateSource::UserBased, id as f32))
            .collect();
        let ranked = rank_top_n(candidates, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].listing_id, 5);
        assert_eq!(ranked[1].listing_id, 4);
    }

    #[test]
    fn test_nan_scores_do_not_panic() {
        let candidates = vec![
            Candidate::new(1, CandidateSource::ItemBased, f32::NAN),
            Candidate::new(2, CandidateSource::ItemBased, 0.8),
        ];
        let ranked = rank_top_n(candidates, 10);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].listing_id, 2);
    }
}
