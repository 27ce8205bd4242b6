//! Turning listings into fixed-length numeric feature vectors.
//!
//! ## Layout
//! A feature vector is the six numeric attributes min-max scaled into
//! [0, 1], followed by three binary flags:
//!
//! | index | feature |
//! |---|---|
//! | 0..6 | price, bedrooms, bathrooms, area, year_built, parking_spaces |
//! | 6 | is_residential |
//! | 7 | has_garage |
//! | 8 | has_pool |
//!
//! The layout never changes for the lifetime of a fit. Refitting replaces
//! the bounds, which invalidates every vector computed under the old fit.

use crate::error::{EngineError, Result};
use catalog::{Listing, ListingId};
use rayon::prelude::*;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Number of min-max scaled attributes
pub const NUMERIC_FEATURES: usize = 6;

/// Total feature vector length (numeric + categorical)
pub const FEATURE_LEN: usize = NUMERIC_FEATURES + 3;

/// Per-attribute min/max bounds fitted over a catalog
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    min: [f64; NUMERIC_FEATURES],
    max: [f64; NUMERIC_FEATURES],
}

impl MinMaxScaler {
    /// Fit bounds over raw numeric rows. Fails on an empty input.
    pub fn fit<'a>(rows: impl IntoIterator<Item = &'a [f64; NUMERIC_FEATURES]>) -> Result<Self> {
        let mut rows = rows.into_iter();
        let first = rows.next().ok_or(EngineError::EmptyCatalog)?;
        let (min, max) = rows.fold((*first, *first), |(mut min, mut max), row| {
            for i in 0..NUMERIC_FEATURES {
                min[i] = min[i].min(row[i]);
                max[i] = max[i].max(row[i]);
            }
            (min, max)
        });
        Ok(Self { min, max })
    }

    /// Fit bounds over the numeric attributes of a catalog
    pub fn fit_listings(listings: &[Listing]) -> Result<Self> {
        let rows: Vec<[f64; NUMERIC_FEATURES]> =
            listings.iter().map(Listing::numeric_attributes).collect();
        Self::fit(&rows)
    }

    /// Scale a row with the fitted bounds.
    ///
    /// Values outside the fitted range scale outside [0, 1]; an attribute
    /// whose min equals its max scales to 0.
    pub fn transform(&self, row: &[f64; NUMERIC_FEATURES]) -> [f32; NUMERIC_FEATURES] {
        let mut scaled = [0.0f32; NUMERIC_FEATURES];
        for i in 0..NUMERIC_FEATURES {
            let range = self.max[i] - self.min[i];
            scaled[i] = if range == 0.0 {
                0.0
            } else {
                ((row[i] - self.min[i]) / range) as f32
            };
        }
        scaled
    }

    pub fn min(&self) -> &[f64; NUMERIC_FEATURES] {
        &self.min
    }

    pub fn max(&self) -> &[f64; NUMERIC_FEATURES] {
        &self.max
    }
}

/// Shared vectorizer whose fit can be replaced while readers are active.
///
/// The fitted scaler sits behind an `Arc` that is swapped whole, so a
/// vectorization in flight keeps the snapshot it started with.
#[derive(Debug, Default)]
pub struct FeatureVectorizer {
    scaler: RwLock<Option<Arc<MinMaxScaler>>>,
}

impl FeatureVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the scaler over a non-empty catalog
    pub fn fit(&self, listings: &[Listing]) -> Result<()> {
        let scaler = Arc::new(MinMaxScaler::fit_listings(listings)?);
        debug!("Fitted scaler over {} listings", listings.len());
        *self.scaler.write().unwrap_or_else(PoisonError::into_inner) = Some(scaler);
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.scaler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The current fit, for callers that need several vectors under one snapshot
    pub fn scaler(&self) -> Result<Arc<MinMaxScaler>> {
        self.scaler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(EngineError::NotFitted)
    }

    /// Vectorize a single listing with the current fit
    pub fn vectorize(&self, listing: &Listing) -> Result<Vec<f32>> {
        let scaler = self.scaler()?;
        Ok(vectorize_with(&scaler, listing))
    }

    /// Vectorize a batch in parallel, all under the same fit
    pub fn vectorize_all(&self, listings: &[Listing]) -> Result<Vec<(ListingId, Vec<f32>)>> {
        let scaler = self.scaler()?;
        Ok(listings
            .par_iter()
            .map(|listing| (listing.id, vectorize_with(&scaler, listing)))
            .collect())
    }
}

/// Build a listing's feature vector. Numeric parts are clamped into [0, 1]
/// so listings added after the fit stay on the same scale.
pub fn vectorize_with(scaler: &MinMaxScaler, listing: &Listing) -> Vec<f32> {
    let numeric = scaler.transform(&listing.numeric_attributes());
    let mut vector = Vec::with_capacity(FEATURE_LEN);
    vector.extend(numeric.iter().map(|v| v.clamp(0.0, 1.0)));
    vector.push(flag(listing.is_residential()));
    vector.push(flag(listing.has_garage));
    vector.push(flag(listing.has_pool));
    vector
}

fn flag(value: bool) -> f32 {
    if value { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{Location, PropertyType};

    fn listing(id: ListingId, price: f64, bedrooms: u32, year_built: u32) -> Listing {
        Listing {
            id,
            price,
            bedrooms,
            bathrooms: 2,
            area: 1200.0,
            year_built,
            parking_spaces: 1,
            property_type: PropertyType::Residential,
            has_garage: id % 2 == 0,
            has_pool: false,
            location: Location::default(),
            description: None,
        }
    }

    fn catalog() -> Vec<Listing> {
        vec![
            listing(1, 100_000.0, 1, 1990),
            listing(2, 300_000.0, 3, 2010),
            listing(3, 200_000.0, 2, 2000),
        ]
    }

    #[test]
    fn test_vectorize_before_fit() {
        let vectorizer = FeatureVectorizer::new();
        assert!(matches!(
            vectorizer.vectorize(&catalog()[0]),
            Err(EngineError::NotFitted)
        ));
    }

    #[test]
    fn test_fit_empty_catalog() {
        let vectorizer = FeatureVectorizer::new();
        assert!(matches!(vectorizer.fit(&[]), Err(EngineError::EmptyCatalog)));
        assert!(!vectorizer.is_fitted());
    }

    #[test]
    fn test_vector_layout_and_range() {
        let vectorizer = FeatureVectorizer::new();
        let listings = catalog();
        vectorizer.fit(&listings).unwrap();

        for listing in &listings {
            let vector = vectorizer.vectorize(listing).unwrap();
            assert_eq!(vector.len(), FEATURE_LEN);
            for value in &vector[..NUMERIC_FEATURES] {
                assert!((0.0..=1.0).contains(value));
            }
        }

        let middle = vectorizer.vectorize(&listings[2]).unwrap();
        assert!((middle[0] - 0.5).abs() < 1e-6); // price
        assert!((middle[1] - 0.5).abs() < 1e-6); // bedrooms
        assert_eq!(middle[2], 0.0); // bathrooms constant -> 0
        assert_eq!(middle[6], 1.0); // residential
        assert_eq!(middle[7], 0.0); // odd id, no garage
    }

    #[test]
    fn test_out_of_range_listing_is_clamped() {
        let vectorizer = FeatureVectorizer::new();
        vectorizer.fit(&catalog()).unwrap();

        let mansion = listing(9, 5_000_000.0, 10, 1800);
        let vector = vectorizer.vectorize(&mansion).unwrap();
        assert_eq!(vector[0], 1.0);
        assert_eq!(vector[4], 0.0);
    }

    #[test]
    fn test_refit_with_superset_keeps_length() {
        let vectorizer = FeatureVectorizer::new();
        let mut listings = catalog();
        vectorizer.fit(&listings).unwrap();
        let before = vectorizer.vectorize(&listings[0]).unwrap().len();

        listings.push(listing(4, 900_000.0, 6, 2020));
        vectorizer.fit(&listings).unwrap();
        let after = vectorizer.vectorize(&listings[0]).unwrap().len();

        assert!(after >= before);
        assert_eq!(vectorizer.scaler().unwrap().max()[0], 900_000.0);
    }

    #[test]
    fn test_transform_is_unclamped() {
        let scaler = MinMaxScaler::fit_listings(&catalog()).unwrap();
        let scaled = scaler.transform(&[400_000.0, 0.0, 2.0, 1200.0, 2000.0, 1.0]);
        assert!((scaled[0] - 1.5).abs() < 1e-6);
        assert!((scaled[1] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_vectorize_all_matches_single() {
        let vectorizer = FeatureVectorizer::new();
        let listings = catalog();
        vectorizer.fit(&listings).unwrap();

        let batch = vectorizer.vectorize_all(&listings).unwrap();
        assert_eq!(batch.len(), listings.len());
        for (id, vector) in batch {
            let listing = listings.iter().find(|l| l.id == id).unwrap();
            assert_eq!(vector, vectorizer.vectorize(listing).unwrap());
        }
    }
}
