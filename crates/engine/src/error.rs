//! Error types for the recommendation engines.
//!
//! Only genuinely exceptional conditions live here. A user without history
//! or a query that filters out every listing is an empty result, not an
//! error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// No listings to fit features on. Fatal when an engine initializes.
    #[error("Catalog is empty: no listings to build features from")]
    EmptyCatalog,

    /// A vectorizer was used before `fit`
    #[error("Feature vectorizer used before it was fitted")]
    NotFitted,

    /// Two vectors that must share a layout did not
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
