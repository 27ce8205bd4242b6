//! Error outcomes a caller of the recommendation service can see.
//!
//! Engine and catalog failures never cross this boundary as-is: an empty
//! catalog is surfaced as its own outcome, anything else is logged and
//! reported as `Unavailable` without detail.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Invalid preferences: {field} {reason}")]
    InvalidPreferences { field: String, reason: String },

    #[error("No listings in the catalog")]
    EmptyCatalog,

    #[error("Recommendation unavailable")]
    Unavailable,

    #[error("Recommendation timed out after {0} ms")]
    Timeout(u64),
}

impl ServiceError {
    pub fn missing(field: &str) -> Self {
        Self::InvalidPreferences {
            field: field.to_string(),
            reason: "is required".to_string(),
        }
    }

    pub fn malformed(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPreferences {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
