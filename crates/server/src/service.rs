//! # Recommendation Service
//!
//! The one entry point callers use. It owns one instance of each engine,
//! all reading from the same catalog store, and:
//! 1. Validates raw query parameters into a typed request
//! 2. Dispatches to the engine for the requested strategy
//! 3. Shapes the ranked candidates into listing records
//! 4. Converts engine failures into `ServiceError` outcomes
//!
//! Engine caches are built lazily on the first request that needs them, or
//! all at once with `warm_up`. Catalog changes reach the engines either
//! synchronously through the `CatalogObserver` impl or off the request path
//! through `notify`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use catalog::{CatalogEvent, CatalogObserver, CatalogStore};
use engine::{
    Candidate, CollaborativeEngine, ContentSimilarityEngine, EngineError, PreferenceMatcher,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::query::{RecommendationRequest, Strategy};
use crate::record::ListingRecord;

/// Facade over the content, preference and collaborative engines
#[derive(Clone)]
pub struct RecommendationService {
    store: Arc<dyn CatalogStore>,
    content: Arc<ContentSimilarityEngine>,
    preference: Arc<PreferenceMatcher>,
    collaborative: Arc<CollaborativeEngine>,
    config: Arc<ServiceConfig>,
}

impl RecommendationService {
    /// Create a service with all engines constructed but not yet loaded
    pub fn new(store: Arc<dyn CatalogStore>, config: ServiceConfig) -> Self {
        let content = Arc::new(ContentSimilarityEngine::new(store.clone(), &config.engine));
        let preference = Arc::new(PreferenceMatcher::new(store.clone()));
        let collaborative = Arc::new(CollaborativeEngine::new(store.clone(), &config.engine));
        Self {
            store,
            content,
            preference,
            collaborative,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Build every engine cache now instead of on first request
    pub fn ensure_initialized(&self) -> Result<()> {
        let start = Instant::now();
        self.preference
            .ensure_initialized()
            .map_err(|e| self.convert_error(Strategy::Preference, e))?;
        self.content
            .ensure_initialized()
            .map_err(|e| self.convert_error(Strategy::Content, e))?;
        self.collaborative
            .ensure_initialized()
            .map_err(|e| self.convert_error(Strategy::UserBased, e))?;
        info!("All engines initialized in {:.2?}", start.elapsed());
        Ok(())
    }

    /// Build every engine cache concurrently on the blocking pool
    pub async fn warm_up(&self) -> Result<()> {
        let start = Instant::now();
        let (preference, content, collaborative) = tokio::join!(
            tokio::task::spawn_blocking({
                let engine = self.preference.clone();
                move || engine.ensure_initialized()
            }),
            tokio::task::spawn_blocking({
                let engine = self.content.clone();
                move || engine.ensure_initialized()
            }),
            tokio::task::spawn_blocking({
                let engine = self.collaborative.clone();
                move || engine.ensure_initialized()
            })
        );

        for (strategy, outcome) in [
            (Strategy::Preference, preference),
            (Strategy::Content, content),
            (Strategy::UserBased, collaborative),
        ] {
            match outcome {
                Ok(result) => result.map_err(|e| self.convert_error(strategy, e))?,
                Err(e) => {
                    error!("Warm-up task for {} panicked: {}", strategy, e);
                    return Err(ServiceError::Unavailable);
                }
            }
        }
        info!("Engines warmed up in {:.2?}", start.elapsed());
        Ok(())
    }

    /// Validate raw parameters and run the strategy on the calling thread
    #[instrument(skip(self, params))]
    pub fn recommend(
        &self,
        strategy: Strategy,
        params: &BTreeMap<String, String>,
    ) -> Result<Vec<ListingRecord>> {
        let request = RecommendationRequest::parse(strategy, params, &self.config)?;
        self.execute(&request)
    }

    /// Run an already-validated request
    pub fn execute(&self, request: &RecommendationRequest) -> Result<Vec<ListingRecord>> {
        let start = Instant::now();
        let strategy = request.strategy();

        let candidates = match *request {
            RecommendationRequest::Preference {
                ref preferences,
                num_recommendations,
            } => self.preference.recommend(preferences, num_recommendations),
            RecommendationRequest::Content { user_id, top_n } => {
                self.content.recommend(user_id, top_n)
            }
            RecommendationRequest::UserBased { user_id, top_n } => {
                self.collaborative.recommend_user_based(user_id, top_n)
            }
            RecommendationRequest::ItemBased { user_id, top_n } => {
                self.collaborative.recommend_item_based(user_id, top_n)
            }
        }
        .map_err(|e| self.convert_error(strategy, e))?;

        let records = self.shape(candidates);
        info!(
            "{} returned {} listings in {:.2?}",
            strategy,
            records.len(),
            start.elapsed()
        );
        Ok(records)
    }

    /// Validate on the caller, compute on the blocking pool under the
    /// configured timeout
    pub async fn recommend_async(
        &self,
        strategy: Strategy,
        params: BTreeMap<String, String>,
    ) -> Result<Vec<ListingRecord>> {
        let request = RecommendationRequest::parse(strategy, &params, &self.config)?;
        let timeout = self.config.request_timeout();

        let task = tokio::task::spawn_blocking({
            let service = self.clone();
            move || service.execute(&request)
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!("{} task panicked: {}", strategy, e);
                Err(ServiceError::Unavailable)
            }
            Err(_) => {
                warn!("{} request exceeded {:?}", strategy, timeout);
                Err(ServiceError::Timeout(self.config.request_timeout_ms))
            }
        }
    }

    /// Apply a catalog change to every engine on the blocking pool.
    ///
    /// Await the handle to know the engines have caught up; dropping it
    /// leaves the update running in the background.
    pub fn notify(&self, event: CatalogEvent) -> JoinHandle<()> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.on_change(&event))
    }

    /// Look up each candidate's listing. Listings deleted since the engine
    /// cache was built are skipped.
    fn shape(&self, candidates: Vec<Candidate>) -> Vec<ListingRecord> {
        candidates
            .into_iter()
            .filter_map(|candidate| match self.store.get_listing(candidate.listing_id) {
                Some(listing) => Some(ListingRecord::new(listing, &candidate)),
                None => {
                    debug!("Listing {} vanished before shaping", candidate.listing_id);
                    None
                }
            })
            .collect()
    }

    fn convert_error(&self, strategy: Strategy, err: EngineError) -> ServiceError {
        match err {
            EngineError::EmptyCatalog => {
                warn!("{} requested against an empty catalog", strategy);
                ServiceError::EmptyCatalog
            }
            other => {
                error!("{} failed: {}", strategy, other);
                ServiceError::Unavailable
            }
        }
    }
}

impl CatalogObserver for RecommendationService {
    fn on_change(&self, event: &CatalogEvent) {
        let start = Instant::now();
        self.preference.on_change(event);
        self.content.on_change(event);
        self.collaborative.on_change(event);
        debug!("Applied {} in {:.2?}", event.name(), start.elapsed());
    }
}
