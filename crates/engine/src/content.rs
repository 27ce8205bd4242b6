//! Content Similarity Engine
//!
//! Recommends listings whose attributes resemble the ones a user already
//! interacted with.
//!
//! ## Algorithm
//! 1. Look up the user's interacted listings; no history means no result
//! 2. Average their cached feature vectors into a profile vector
//! 3. Cosine-compare the profile against every cached listing vector
//! 4. Drop seen listings and anything below the similarity threshold
//! 5. Rank by similarity (ties by id) and keep `top_n`
//!
//! The vector cache is rebuilt wholesale on every listing change. Catalogs
//! in this domain are small enough that a full rebuild is cheaper than
//! tracking which vectors a refit invalidated.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::filter_pipeline::FilterPipeline;
use crate::filters::{AlreadySeenFilter, MinimumScoreFilter};
use crate::ranking::rank_top_n;
use crate::similarity::{checked_cosine_similarity, mean_vector};
use crate::types::{Candidate, CandidateSource};
use crate::user_context::build_user_context;
use crate::vectorizer::FeatureVectorizer;
use catalog::{CatalogEvent, CatalogObserver, CatalogStore, ListingId, UserId};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Feature vectors for the whole catalog under one scaler fit
#[derive(Debug, Default)]
struct ContentIndex {
    vectors: BTreeMap<ListingId, Vec<f32>>,
}

pub struct ContentSimilarityEngine {
    store: Arc<dyn CatalogStore>,
    vectorizer: FeatureVectorizer,
    index: RwLock<Option<Arc<ContentIndex>>>,
    /// Serializes rebuilds so a fit and its vectors always come from the same catalog read
    reload_lock: Mutex<()>,
    similarity_threshold: f32,
}

impl ContentSimilarityEngine {
    pub fn new(store: Arc<dyn CatalogStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            vectorizer: FeatureVectorizer::new(),
            index: RwLock::new(None),
            reload_lock: Mutex::new(()),
            similarity_threshold: config.similarity_threshold,
        }
    }

    /// Configure the minimum similarity for a match (default: 0.7)
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Build the cache on first use
    pub fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }
        let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_initialized() {
            return Ok(());
        }
        self.rebuild()
    }

    /// Refit the vectorizer and recompute every cached vector
    pub fn reload(&self) -> Result<()> {
        let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.rebuild()
    }

    fn rebuild(&self) -> Result<()> {
        let start = Instant::now();
        let listings = self.store.list_all_listings();
        if listings.is_empty() {
            *self.index.write().unwrap_or_else(PoisonError::into_inner) = None;
            return Err(EngineError::EmptyCatalog);
        }

        self.vectorizer.fit(&listings)?;
        let vectors = self.vectorizer.vectorize_all(&listings)?.into_iter().collect();
        let index = Arc::new(ContentIndex { vectors });

        *self.index.write().unwrap_or_else(PoisonError::into_inner) = Some(index);
        info!(
            "Content index rebuilt: {} vectors in {:.2?}",
            listings.len(),
            start.elapsed()
        );
        Ok(())
    }

    /// Cached feature vector for a listing
    pub fn vector(&self, listing_id: ListingId) -> Option<Vec<f32>> {
        self.snapshot()?.vectors.get(&listing_id).cloned()
    }

    /// Listings most similar to the user's interaction profile
    #[instrument(skip(self))]
    pub fn recommend(&self, user_id: UserId, top_n: usize) -> Result<Vec<Candidate>> {
        self.ensure_initialized()?;
        let Some(index) = self.snapshot() else {
            return Ok(Vec::new());
        };

        let context = build_user_context(self.store.as_ref(), user_id);
        if !context.has_history() {
            debug!("User {} has no interactions", user_id);
            return Ok(Vec::new());
        }

        let seen = context.seen_sorted();
        let profile = mean_vector(
            seen.iter()
                .filter_map(|id| index.vectors.get(id).map(Vec::as_slice)),
        );
        let Some(profile) = profile else {
            debug!("None of user {}'s listings are in the content index", user_id);
            return Ok(Vec::new());
        };

        let candidates = index
            .vectors
            .iter()
            .map(|(&listing_id, vector)| {
                let similarity = checked_cosine_similarity(&profile, vector)?;
                Ok(Candidate::new(listing_id, CandidateSource::Content, similarity))
            })
            .collect::<Result<Vec<_>>>()?;

        let pipeline = FilterPipeline::new()
            .add_filter(AlreadySeenFilter)
            .add_filter(MinimumScoreFilter::new(self.similarity_threshold));
        let survivors = pipeline.apply(candidates, &context)?;

        let ranked = rank_top_n(survivors, top_n);
        debug!("Content engine returning {} listings", ranked.len());
        Ok(ranked)
    }

    fn snapshot(&self) -> Option<Arc<ContentIndex>> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CatalogObserver for ContentSimilarityEngine {
    fn on_change(&self, event: &CatalogEvent) {
        match event {
            CatalogEvent::ListingCreated(_)
            | CatalogEvent::ListingUpdated(_)
            | CatalogEvent::ListingDeleted(_) => {
                // Waits out an in-flight first build, which may predate this change
                let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);
                // Never built yet: the first request will load the current catalog
                if !self.is_initialized() {
                    return;
                }
                if let Err(e) = self.rebuild() {
                    warn!("Content index reload after {} failed: {}", event.name(), e);
                }
            }
            // Profiles are read from the store per request
            CatalogEvent::InteractionRecorded(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{InMemoryCatalog, Interaction, InteractionKind, Listing, Location, PropertyType};

    fn listing(id: ListingId, price: f64, bedrooms: u32, has_pool: bool) -> Listing {
        Listing {
            id,
            price,
            bedrooms,
            bathrooms: bedrooms.saturating_sub(1).max(1),
            area: 500.0 * bedrooms as f64,
            year_built: 2000,
            parking_spaces: 1,
            property_type: PropertyType::Residential,
            has_garage: true,
            has_pool,
            location: Location::new("Austin", "USA"),
            description: None,
        }
    }

    fn create_test_store() -> Arc<InMemoryCatalog> {
        Arc::new(InMemoryCatalog::from_parts(
            vec![
                listing(1, 200_000.0, 2, false),
                listing(2, 210_000.0, 2, false),
                listing(3, 220_000.0, 2, false),
                listing(4, 900_000.0, 6, true),
            ],
            vec![Interaction::new(1, 1, InteractionKind::Like)],
        ))
    }

    #[test]
    fn test_recommends_similar_unseen_listings() {
        let store = create_test_store();
        let engine = ContentSimilarityEngine::new(store, &EngineConfig::default());

        let candidates = engine.recommend(1, 10).unwrap();
        let ids: Vec<ListingId> = candidates.iter().map(|c| c.listing_id).collect();

        assert!(ids.contains(&2));
        assert!(ids.contains(&3));
        assert!(!ids.contains(&1), "seen listing must not be recommended");
        assert!(!ids.contains(&4), "dissimilar listing is below threshold");
        assert!(candidates.iter().all(|c| c.score >= 0.7));
        assert!(candidates.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_user_without_history_gets_empty_result() {
        let engine = ContentSimilarityEngine::new(create_test_store(), &EngineConfig::default());
        assert!(engine.recommend(99, 10).unwrap().is_empty());
    }

    #[test]
    fn test_empty_catalog_is_an_error() {
        let store = Arc::new(InMemoryCatalog::new());
        let engine = ContentSimilarityEngine::new(store, &EngineConfig::default());
        assert!(matches!(
            engine.recommend(1, 10),
            Err(EngineError::EmptyCatalog)
        ));
        assert!(!engine.is_initialized());
    }

    #[test]
    fn test_threshold_is_configurable() {
        let engine = ContentSimilarityEngine::new(create_test_store(), &EngineConfig::default())
            .with_similarity_threshold(-1.0);
        let ids: Vec<ListingId> = engine
            .recommend(1, 10)
            .unwrap()
            .iter()
            .map(|c| c.listing_id)
            .collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&4));
    }

    #[test]
    fn test_listing_events_rebuild_cache() {
        let store = create_test_store();
        let engine = Arc::new(ContentSimilarityEngine::new(
            store.clone(),
            &EngineConfig::default(),
        ));
        store.subscribe(engine.clone());
        engine.ensure_initialized().unwrap();

        store.upsert_listing(listing(5, 205_000.0, 2, false)).unwrap();
        assert!(engine.vector(5).is_some());

        store.delete_listing(5);
        assert!(engine.vector(5).is_none());
    }
}
