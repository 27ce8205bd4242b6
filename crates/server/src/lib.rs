//! Recommendation service for the real-estate recommender.
//!
//! This crate contains the facade that validates requests, dispatches them
//! to the engines and shapes the results for callers.

pub mod config;
pub mod error;
pub mod query;
pub mod record;
pub mod service;

pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use query::{RecommendationRequest, Strategy};
pub use record::ListingRecord;
pub use service::RecommendationService;
