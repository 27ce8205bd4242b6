//! Turning raw query parameters into typed recommendation requests.
//!
//! Callers hand over whatever they received (a query string, CLI flags) as
//! string pairs. Every missing or malformed field is reported by name.

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use catalog::UserId;
use engine::Preferences;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which engine answers a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Preference,
    Content,
    UserBased,
    ItemBased,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Preference,
        Strategy::Content,
        Strategy::UserBased,
        Strategy::ItemBased,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Preference => "preference",
            Strategy::Content => "content",
            Strategy::UserBased => "user-based",
            Strategy::ItemBased => "item-based",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ServiceError::malformed("strategy", format!("has unknown value '{}'", s)))
    }
}

/// A validated request for one strategy
#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationRequest {
    Preference {
        preferences: Preferences,
        num_recommendations: usize,
    },
    Content {
        user_id: UserId,
        top_n: usize,
    },
    UserBased {
        user_id: UserId,
        top_n: usize,
    },
    ItemBased {
        user_id: UserId,
        top_n: usize,
    },
}

impl RecommendationRequest {
    /// Validate raw parameters for a strategy.
    ///
    /// Preference requests need all six preference fields; the others need
    /// `user_id`. Counts are optional and fall back to the config defaults.
    pub fn parse(
        strategy: Strategy,
        params: &BTreeMap<String, String>,
        config: &ServiceConfig,
    ) -> Result<Self> {
        let params = Params(params);
        match strategy {
            Strategy::Preference => Ok(Self::Preference {
                preferences: Preferences {
                    budget: params.non_negative("budget")?,
                    min_bedrooms: params.required("min_bedrooms")?,
                    min_bathrooms: params.required("min_bathrooms")?,
                    preferred_area: params.non_negative("preferred_area")?,
                    min_year_built: params.required("min_year_built")?,
                    parking_spaces: params.required("parking_spaces")?,
                },
                num_recommendations: params
                    .count("num_recommendations", config.default_num_recommendations)?,
            }),
            Strategy::Content => Ok(Self::Content {
                user_id: params.required("user_id")?,
                top_n: params.count("top_n", config.default_top_n)?,
            }),
            Strategy::UserBased => Ok(Self::UserBased {
                user_id: params.required("user_id")?,
                top_n: params.count("top_n", config.default_top_n)?,
            }),
            Strategy::ItemBased => Ok(Self::ItemBased {
                user_id: params.required("user_id")?,
                top_n: params.count("top_n", config.default_top_n)?,
            }),
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            Self::Preference { .. } => Strategy::Preference,
            Self::Content { .. } => Strategy::Content,
            Self::UserBased { .. } => Strategy::UserBased,
            Self::ItemBased { .. } => Strategy::ItemBased,
        }
    }
}

struct Params<'a>(&'a BTreeMap<String, String>);

impl Params<'_> {
    fn required<T: FromStr>(&self, field: &str) -> Result<T> {
        let raw = self.0.get(field).ok_or_else(|| ServiceError::missing(field))?;
        raw.trim()
            .parse()
            .map_err(|_| ServiceError::malformed(field, format!("has invalid value '{}'", raw)))
    }

    fn non_negative(&self, field: &str) -> Result<f64> {
        let value: f64 = self.required(field)?;
        if !value.is_finite() || value < 0.0 {
            return Err(ServiceError::malformed(
                field,
                "must be a non-negative number",
            ));
        }
        Ok(value)
    }

    fn count(&self, field: &str, default: usize) -> Result<usize> {
        if !self.0.contains_key(field) {
            return Ok(default);
        }
        match self.required::<usize>(field)? {
            0 => Err(ServiceError::malformed(field, "must be at least 1")),
            n => Ok(n),
        }
    }
}
