//! Collaborative Filtering Engine
//!
//! Recommends listings from patterns in everyone's interaction history.
//!
//! ## User-based path
//! 1. Candidate neighbours are users sharing at least one listing with the
//!    target (no full user × user scan)
//! 2. Neighbour similarity is an agreement ratio: the fraction of shared
//!    listings where the two weights differ by at most the tolerance
//! 3. Unseen listings from agreeing neighbours are scored by the
//!    similarity-weighted average of the neighbours' weights
//!
//! ## Item-based path
//! 1. Item similarity = `0.4 * Jaccard(rater sets) + 0.6 * mean(1 - |Δweight| / 3)`
//!    over users who interacted with both, cached per unordered pair
//! 2. An unseen listing's score is the similarity-weighted mean of the
//!    user's weights on seen listings, counting only pairs above 0.1
//! 3. The result is blended with the listing's own popularity
//!
//! Both paths fall back to globally popular unseen listings when nothing
//! personalised can be scored. No history, or nothing surviving the
//! fallback, is an empty result.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::filter_pipeline::FilterPipeline;
use crate::filters::AlreadySeenFilter;
use crate::matrix::InteractionMatrix;
use crate::ranking::rank_top_n;
use crate::similarity::jaccard_similarity;
use crate::types::{Candidate, CandidateSource, UserContext};
use catalog::{CatalogEvent, CatalogObserver, CatalogStore, InteractionKind, ListingId, UserId};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, info, instrument};

const MAX_WEIGHT: f32 = InteractionKind::MAX_WEIGHT as f32;

/// A matrix and the item similarities computed against it.
///
/// The cache lives and dies with its matrix, so a reload can never leave
/// stale similarities behind.
#[derive(Debug, Default)]
struct CollaborativeState {
    matrix: InteractionMatrix,
    item_similarity: Mutex<HashMap<(ListingId, ListingId), f32>>,
}

pub struct CollaborativeEngine {
    store: Arc<dyn CatalogStore>,
    state: RwLock<Option<Arc<CollaborativeState>>>,
    reload_lock: Mutex<()>,
    config: EngineConfig,
}

impl CollaborativeEngine {
    pub fn new(store: Arc<dyn CatalogStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            state: RwLock::new(None),
            reload_lock: Mutex::new(()),
            config: config.clone(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Build the matrix on first use
    pub fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }
        let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_initialized() {
            return Ok(());
        }
        self.rebuild();
        Ok(())
    }

    /// Rebuild the matrix from the store's full interaction feed
    pub fn reload(&self) -> Result<()> {
        let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.rebuild();
        Ok(())
    }

    fn rebuild(&self) {
        let start = Instant::now();
        let interactions = self.store.list_interactions(None);
        let state = CollaborativeState {
            matrix: InteractionMatrix::from_interactions(&interactions),
            item_similarity: Mutex::new(HashMap::new()),
        };
        if self.config.precompute_item_similarities {
            self.precompute(&state);
        }
        let (users, listings, entries) = state.matrix.counts();
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(state));
        info!(
            "Interaction matrix rebuilt: {} users, {} listings, {} entries in {:.2?}",
            users,
            listings,
            entries,
            start.elapsed()
        );
    }

    /// Fill the item similarity cache for every co-rated pair in parallel
    fn precompute(&self, state: &CollaborativeState) {
        let ids = state.matrix.listing_ids();
        let ids: &[ListingId] = &ids;
        let pairs: HashMap<(ListingId, ListingId), f32> = ids
            .par_iter()
            .enumerate()
            .flat_map_iter(move |(i, &a)| {
                ids[i + 1..]
                    .iter()
                    .map(move |&b| ((a, b), self.compute_item_similarity(&state.matrix, a, b)))
            })
            .filter(|(_, sim)| *sim > 0.0)
            .collect();
        debug!("Precomputed {} item similarities", pairs.len());
        *state
            .item_similarity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = pairs;
    }

    /// Recommend listings liked by users who agree with this user
    #[instrument(skip(self))]
    pub fn recommend_user_based(&self, user_id: UserId, top_n: usize) -> Result<Vec<Candidate>> {
        self.ensure_initialized()?;
        let Some(state) = self.snapshot() else {
            return Ok(Vec::new());
        };
        let matrix = &state.matrix;

        let Some(target) = matrix.user_weights(user_id) else {
            debug!("User {} has no interactions", user_id);
            return Ok(Vec::new());
        };

        let neighbours = self.find_agreeing_users(matrix, user_id, target);
        debug!("Found {} agreeing users", neighbours.len());

        let mut weighted: HashMap<ListingId, (f32, f32)> = HashMap::new();
        for &(neighbour, similarity) in &neighbours {
            let Some(listings) = matrix.user_weights(neighbour) else {
                continue;
            };
            for (&listing_id, &weight) in listings {
                if target.contains_key(&listing_id) {
                    continue;
                }
                let entry = weighted.entry(listing_id).or_insert((0.0, 0.0));
                entry.0 += weight as f32 * similarity;
                entry.1 += similarity;
            }
        }

        let mut candidates: Vec<Candidate> = weighted
            .into_iter()
            .filter(|(_, (_, sim_sum))| *sim_sum > 0.0)
            .map(|(listing_id, (score, sim_sum))| {
                Candidate::new(listing_id, CandidateSource::UserBased, score / sim_sum)
            })
            .collect();

        if candidates.is_empty() {
            debug!("No neighbour candidates, falling back to popularity");
            candidates = self.popular_unseen(matrix, target, |_, avg| avg);
        }

        self.finish(user_id, target, candidates, top_n)
    }

    /// Users sharing at least one listing with the target, with their
    /// agreement ratio. Only users with a positive ratio are returned.
    fn find_agreeing_users(
        &self,
        matrix: &InteractionMatrix,
        user_id: UserId,
        target: &HashMap<ListingId, u8>,
    ) -> Vec<(UserId, f32)> {
        let candidates: BTreeSet<UserId> = target
            .keys()
            .filter_map(|&listing_id| matrix.listing_raters(listing_id))
            .flat_map(|raters| raters.keys().copied())
            .filter(|&other| other != user_id)
            .collect();

        candidates
            .into_iter()
            .filter_map(|other| {
                let other_weights = matrix.user_weights(other)?;
                let similarity = self.agreement_ratio(target, other_weights);
                (similarity > 0.0).then_some((other, similarity))
            })
            .collect()
    }

    /// Fraction of shared listings where the two users' weights are within tolerance
    pub fn agreement_ratio(&self, a: &HashMap<ListingId, u8>, b: &HashMap<ListingId, u8>) -> f32 {
        let mut shared = 0u32;
        let mut agreeing = 0u32;
        for (listing_id, &weight_a) in a {
            if let Some(&weight_b) = b.get(listing_id) {
                shared += 1;
                if weight_a.abs_diff(weight_b) <= self.config.agreement_tolerance {
                    agreeing += 1;
                }
            }
        }
        if shared == 0 {
            0.0
        } else {
            agreeing as f32 / shared as f32
        }
    }

    /// Recommend listings similar to the ones this user interacted with
    #[instrument(skip(self))]
    pub fn recommend_item_based(&self, user_id: UserId, top_n: usize) -> Result<Vec<Candidate>> {
        self.ensure_initialized()?;
        let Some(state) = self.snapshot() else {
            return Ok(Vec::new());
        };
        let matrix = &state.matrix;

        let Some(target) = matrix.user_weights(user_id) else {
            debug!("User {} has no interactions", user_id);
            return Ok(Vec::new());
        };

        let mut seen: Vec<(ListingId, u8)> = target.iter().map(|(&id, &w)| (id, w)).collect();
        seen.sort_unstable();
        let unseen: Vec<ListingId> = matrix
            .listing_ids()
            .into_iter()
            .filter(|id| !target.contains_key(id))
            .collect();

        let blend = self.config.score_blend;
        let mut candidates: Vec<Candidate> = unseen
            .par_iter()
            .filter_map(|&listing_id| {
                let mut score = 0.0f32;
                let mut sim_sum = 0.0f32;
                for &(seen_id, weight) in &seen {
                    let similarity = self.cached_item_similarity(&state, seen_id, listing_id);
                    if similarity > self.config.min_item_similarity {
                        score += similarity * weight as f32;
                        sim_sum += similarity;
                    }
                }
                if sim_sum <= 0.0 {
                    return None;
                }
                let avg_weight = matrix
                    .popularity(listing_id)
                    .map(|p| p.avg_weight)
                    .unwrap_or(0.0);
                let final_score = blend * (score / sim_sum) + (1.0 - blend) * (avg_weight / MAX_WEIGHT);
                Some(Candidate::new(listing_id, CandidateSource::ItemBased, final_score))
            })
            .collect();

        if candidates.is_empty() {
            debug!("No similar items above threshold, falling back to popularity");
            candidates = self.popular_unseen(matrix, target, |count, avg| {
                count as f32 * avg / MAX_WEIGHT
            });
        }

        self.finish(user_id, target, candidates, top_n)
    }

    /// Item similarity between two listings, computed once per unordered pair
    pub fn item_similarity(&self, a: ListingId, b: ListingId) -> Result<f32> {
        self.ensure_initialized()?;
        Ok(self
            .snapshot()
            .map(|state| self.cached_item_similarity(&state, a, b))
            .unwrap_or(0.0))
    }

    fn cached_item_similarity(&self, state: &CollaborativeState, a: ListingId, b: ListingId) -> f32 {
        if a == b {
            return 1.0;
        }
        let key = (a.min(b), a.max(b));
        if let Some(&cached) = state
            .item_similarity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return cached;
        }
        let similarity = self.compute_item_similarity(&state.matrix, key.0, key.1);
        state
            .item_similarity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, similarity);
        similarity
    }

    fn compute_item_similarity(&self, matrix: &InteractionMatrix, a: ListingId, b: ListingId) -> f32 {
        let (Some(raters_a), Some(raters_b)) = (matrix.listing_raters(a), matrix.listing_raters(b))
        else {
            return 0.0;
        };

        let users_a: HashSet<UserId> = raters_a.keys().copied().collect();
        let users_b: HashSet<UserId> = raters_b.keys().copied().collect();
        let overlap = jaccard_similarity(&users_a, &users_b);

        let agreements: Vec<f32> = users_a
            .intersection(&users_b)
            .map(|user| {
                let diff = raters_a[user].abs_diff(raters_b[user]) as f32;
                1.0 - diff / MAX_WEIGHT
            })
            .collect();
        if agreements.is_empty() {
            return 0.0;
        }
        let agreement = agreements.iter().sum::<f32>() / agreements.len() as f32;

        self.config.jaccard_weight * overlap + self.config.rating_agreement_weight * agreement
    }

    /// Unseen listings with enough interactions, scored by `score(count, avg_weight)`
    fn popular_unseen(
        &self,
        matrix: &InteractionMatrix,
        target: &HashMap<ListingId, u8>,
        score: impl Fn(usize, f32) -> f32,
    ) -> Vec<Candidate> {
        matrix
            .listing_ids()
            .into_iter()
            .filter(|id| !target.contains_key(id))
            .filter_map(|id| {
                let popularity = matrix.popularity(id)?;
                (popularity.count >= self.config.min_popularity_interactions).then(|| {
                    Candidate::new(
                        id,
                        CandidateSource::Popularity,
                        score(popularity.count, popularity.avg_weight),
                    )
                })
            })
            .collect()
    }

    fn finish(
        &self,
        user_id: UserId,
        target: &HashMap<ListingId, u8>,
        candidates: Vec<Candidate>,
        top_n: usize,
    ) -> Result<Vec<Candidate>> {
        let mut context = UserContext::new(user_id);
        context.weights = target.clone();
        context.seen_listings = target.keys().copied().collect();

        let survivors = FilterPipeline::new()
            .add_filter(AlreadySeenFilter)
            .apply(candidates, &context)?;
        let ranked = rank_top_n(survivors, top_n);
        debug!("Collaborative engine returning {} listings", ranked.len());
        Ok(ranked)
    }

    fn snapshot(&self) -> Option<Arc<CollaborativeState>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CatalogObserver for CollaborativeEngine {
    fn on_change(&self, event: &CatalogEvent) {
        match event {
            CatalogEvent::ListingDeleted(_) | CatalogEvent::InteractionRecorded(_) => {
                // Held across the check so a first build in progress is followed by a reload
                let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);
                if !self.is_initialized() {
                    return;
                }
                self.rebuild();
            }
            // Attribute changes don't touch the interaction matrix
            CatalogEvent::ListingCreated(_) | CatalogEvent::ListingUpdated(_) => {}
        }
    }
}
