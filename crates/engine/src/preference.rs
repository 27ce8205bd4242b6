//! Preference Matcher
//!
//! Scores listings against an explicit preference query under hard
//! constraints.
//!
//! ## Algorithm
//! 1. Scale the preference vector with the catalog's scaler (never refit)
//! 2. Cosine-compare it with every row of the normalized feature matrix
//! 3. Drop rows with price > budget, bedrooms < min or bathrooms < min
//! 4. Rank survivors by similarity (ties by id) and keep `top_n`
//!
//! Unlike the content engine, the matrix is maintained incrementally:
//! new listings are transformed with the existing scaler and appended,
//! deleted ones are dropped, without rescanning the catalog.

use crate::error::{EngineError, Result};
use crate::ranking::rank_top_n;
use crate::similarity::cosine_similarity;
use crate::types::{Candidate, CandidateSource};
use crate::vectorizer::{MinMaxScaler, NUMERIC_FEATURES};
use catalog::{CatalogEvent, CatalogObserver, CatalogStore, Listing, ListingId};
use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, instrument, warn};

/// An explicit preference query
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Preferences {
    pub budget: f64,
    pub min_bedrooms: u32,
    pub min_bathrooms: u32,
    pub preferred_area: f64,
    pub min_year_built: u32,
    pub parking_spaces: u32,
}

impl Preferences {
    /// The query laid out like a listing's numeric attributes
    pub fn as_row(&self) -> [f64; NUMERIC_FEATURES] {
        [
            self.budget,
            self.min_bedrooms as f64,
            self.min_bathrooms as f64,
            self.preferred_area,
            self.min_year_built as f64,
            self.parking_spaces as f64,
        ]
    }

    /// Hard constraints: within budget and at least the requested rooms
    pub fn admits(&self, row: &MatrixRow) -> bool {
        row.price <= self.budget
            && row.bedrooms >= self.min_bedrooms
            && row.bathrooms >= self.min_bathrooms
    }
}

/// One catalog row: the constrained attributes plus its normalized features
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRow {
    pub listing_id: ListingId,
    pub price: f64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub features: [f32; NUMERIC_FEATURES],
}

impl MatrixRow {
    fn from_listing(scaler: &MinMaxScaler, listing: &Listing) -> Self {
        Self {
            listing_id: listing.id,
            price: listing.price,
            bedrooms: listing.bedrooms,
            bathrooms: listing.bathrooms,
            features: scaler.transform(&listing.numeric_attributes()),
        }
    }
}

/// Tabular snapshot of the catalog with its fitted scaler
#[derive(Debug, Clone)]
struct FeatureMatrix {
    scaler: MinMaxScaler,
    rows: Vec<MatrixRow>,
}

pub struct PreferenceMatcher {
    store: Arc<dyn CatalogStore>,
    matrix: RwLock<Option<Arc<FeatureMatrix>>>,
    /// Single writer for load/add/remove
    write_lock: Mutex<()>,
}

impl PreferenceMatcher {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            matrix: RwLock::new(None),
            write_lock: Mutex::new(()),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Load the matrix on first use
    pub fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_initialized() {
            return Ok(());
        }
        self.load()
    }

    /// Refit the scaler and rebuild the matrix from the full catalog
    pub fn reload(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load()
    }

    fn load(&self) -> Result<()> {
        let listings = self.store.list_all_listings();
        let scaler = MinMaxScaler::fit_listings(&listings)?;
        let rows = listings
            .iter()
            .map(|listing| MatrixRow::from_listing(&scaler, listing))
            .collect();
        self.swap(FeatureMatrix { scaler, rows });
        info!("Preference matrix loaded with {} rows", listings.len());
        Ok(())
    }

    /// Append one listing using the existing scaler.
    ///
    /// A listing already in the matrix is replaced. Does nothing before the
    /// first load, which will pick the listing up from the store anyway.
    pub fn add(&self, listing: &Listing) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(current) = self.snapshot() else {
            return;
        };
        let mut matrix = FeatureMatrix::clone(&current);
        matrix.rows.retain(|row| row.listing_id != listing.id);
        matrix.rows.push(MatrixRow::from_listing(&matrix.scaler, listing));
        self.swap(matrix);
        debug!("Added listing {} to preference matrix", listing.id);
    }

    /// Drop one listing's row. Returns whether a row was removed.
    pub fn remove(&self, listing_id: ListingId) -> bool {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(current) = self.snapshot() else {
            return false;
        };
        if !current.rows.iter().any(|row| row.listing_id == listing_id) {
            return false;
        }
        let mut matrix = FeatureMatrix::clone(&current);
        matrix.rows.retain(|row| row.listing_id != listing_id);
        self.swap(matrix);
        debug!("Removed listing {} from preference matrix", listing_id);
        true
    }

    /// Number of rows in the matrix (0 before the first load)
    pub fn row_count(&self) -> usize {
        self.snapshot().map(|m| m.rows.len()).unwrap_or(0)
    }

    /// Best listings for an explicit preference query.
    ///
    /// An empty result means no listing satisfies the hard constraints.
    #[instrument(skip(self))]
    pub fn recommend(&self, preferences: &Preferences, top_n: usize) -> Result<Vec<Candidate>> {
        self.ensure_initialized()?;
        let matrix = self.snapshot().ok_or(EngineError::NotFitted)?;
        // Every listing deleted since the load
        if matrix.rows.is_empty() {
            return Err(EngineError::EmptyCatalog);
        }

        let query = matrix.scaler.transform(&preferences.as_row());
        let candidates: Vec<Candidate> = matrix
            .rows
            .iter()
            .filter(|row| preferences.admits(row))
            .map(|row| {
                Candidate::new(
                    row.listing_id,
                    CandidateSource::Preference,
                    cosine_similarity(&row.features, &query),
                )
            })
            .collect();

        debug!(
            "{} of {} listings satisfy the hard constraints",
            candidates.len(),
            matrix.rows.len()
        );
        Ok(rank_top_n(candidates, top_n))
    }

    fn snapshot(&self) -> Option<Arc<FeatureMatrix>> {
        self.matrix
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn swap(&self, matrix: FeatureMatrix) {
        *self.matrix.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(matrix));
    }
}

impl CatalogObserver for PreferenceMatcher {
    fn on_change(&self, event: &CatalogEvent) {
        match event {
            CatalogEvent::ListingCreated(listing) | CatalogEvent::ListingUpdated(listing) => {
                self.add(listing)
            }
            CatalogEvent::ListingDeleted(id) => {
                if !self.remove(*id) && self.is_initialized() {
                    warn!("Deleted listing {} was not in the preference matrix", id);
                }
            }
            CatalogEvent::InteractionRecorded(_) => {}
        }
    }
}
