//! Shared types passed between the strategies, filters and the façade.

use catalog::{ListingId, UserId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Which strategy produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Explicit preference query
    Preference,
    /// Attribute similarity to the user's history
    Content,
    /// Listings liked by users who agree with this user
    UserBased,
    /// Listings similar to the ones this user interacted with
    ItemBased,
    /// Globally popular listings, used when nothing personalised survives
    Popularity,
}

/// A scored listing on its way to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub listing_id: ListingId,
    pub source: CandidateSource,
    pub score: f32,
}

impl Candidate {
    pub fn new(listing_id: ListingId, source: CandidateSource, score: f32) -> Self {
        Self {
            listing_id,
            source,
            score,
        }
    }
}

/// Everything a strategy needs to know about the requesting user
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    pub user_id: UserId,
    /// Strongest interaction weight per listing the user touched
    pub weights: HashMap<ListingId, u8>,
    /// Listings the user interacted with in any way
    pub seen_listings: HashSet<ListingId>,
}

impl UserContext {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    pub fn has_history(&self) -> bool {
        !self.seen_listings.is_empty()
    }

    /// Seen listings in ascending id order
    pub fn seen_sorted(&self) -> Vec<ListingId> {
        let mut ids: Vec<ListingId> = self.seen_listings.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}
