//! Recommendation strategies for real-estate listings.
//!
//! This crate provides:
//! - `FeatureVectorizer` and `MinMaxScaler` for turning listings into feature vectors
//! - `ContentSimilarityEngine` for "more like what you looked at"
//! - `PreferenceMatcher` for explicit budget/size queries under hard constraints
//! - `CollaborativeEngine` for user-based and item-based collaborative filtering
//! - `Filter` trait and `FilterPipeline` for composing candidate filters
//!
//! ## Architecture
//! Every engine reads from a shared `CatalogStore` and keeps its own derived
//! cache behind an `Arc` that is swapped whole on rebuild:
//! 1. Caches are built lazily by `ensure_initialized()` on first request
//! 2. Engines subscribe to catalog changes as `CatalogObserver`s
//! 3. Requests produce `Candidate`s, run them through a `FilterPipeline`
//!    and rank with `rank_top_n`
//!
//! ## Example Usage
//! ```ignore
//! use catalog::InMemoryCatalog;
//! use engine::{CollaborativeEngine, EngineConfig};
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryCatalog::load_from_dir(dir)?);
//! let collaborative = Arc::new(CollaborativeEngine::new(store.clone(), &EngineConfig::default()));
//! store.subscribe(collaborative.clone());
//!
//! let candidates = collaborative.recommend_user_based(42, 10)?;
//! ```

pub mod collaborative;
pub mod config;
pub mod content;
pub mod error;
pub mod filter_pipeline;
pub mod filters;
pub mod matrix;
pub mod preference;
pub mod ranking;
pub mod similarity;
pub mod traits;
pub mod types;
pub mod user_context;
pub mod vectorizer;

// Re-export main types
pub use collaborative::CollaborativeEngine;
pub use config::EngineConfig;
pub use content::ContentSimilarityEngine;
pub use error::{EngineError, Result};
pub use filter_pipeline::FilterPipeline;
pub use matrix::{InteractionMatrix, ListingPopularity};
pub use preference::{PreferenceMatcher, Preferences};
pub use ranking::rank_top_n;
pub use traits::Filter;
pub use types::{Candidate, CandidateSource, UserContext};
pub use vectorizer::{FEATURE_LEN, FeatureVectorizer, MinMaxScaler, NUMERIC_FEATURES};
