//! Sparse user × listing interaction matrix.
//!
//! Stored twice, once per axis, so both "what did this user touch" and
//! "who touched this listing" are single lookups. Every entry is present
//! in both views with the same weight.

use catalog::{Interaction, ListingId, UserId};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct InteractionMatrix {
    by_user: HashMap<UserId, HashMap<ListingId, u8>>,
    by_listing: HashMap<ListingId, HashMap<UserId, u8>>,
}

/// Interaction count and mean weight of a listing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListingPopularity {
    pub count: usize,
    pub avg_weight: f32,
}

impl InteractionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an interaction feed. Repeated pairs keep the highest weight.
    pub fn from_interactions<'a>(interactions: impl IntoIterator<Item = &'a Interaction>) -> Self {
        let mut matrix = Self::new();
        for interaction in interactions {
            matrix.insert(interaction.user_id, interaction.listing_id, interaction.weight());
        }
        matrix
    }

    /// Set the weight for a pair in both views, never lowering an existing weight
    pub fn insert(&mut self, user_id: UserId, listing_id: ListingId, weight: u8) {
        let slot = self
            .by_user
            .entry(user_id)
            .or_default()
            .entry(listing_id)
            .or_insert(0);
        *slot = (*slot).max(weight);
        let weight = *slot;
        self.by_listing
            .entry(listing_id)
            .or_default()
            .insert(user_id, weight);
    }

    /// Listings a user interacted with, and their weights
    pub fn user_weights(&self, user_id: UserId) -> Option<&HashMap<ListingId, u8>> {
        self.by_user.get(&user_id).filter(|w| !w.is_empty())
    }

    /// Users who interacted with a listing, and their weights
    pub fn listing_raters(&self, listing_id: ListingId) -> Option<&HashMap<UserId, u8>> {
        self.by_listing.get(&listing_id).filter(|r| !r.is_empty())
    }

    pub fn weight(&self, user_id: UserId, listing_id: ListingId) -> Option<u8> {
        self.by_user.get(&user_id)?.get(&listing_id).copied()
    }

    /// Every listing with at least one interaction, ascending
    pub fn listing_ids(&self) -> Vec<ListingId> {
        let mut ids: Vec<ListingId> = self.by_listing.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn popularity(&self, listing_id: ListingId) -> Option<ListingPopularity> {
        let raters = self.listing_raters(listing_id)?;
        let total: u32 = raters.values().map(|&w| w as u32).sum();
        Some(ListingPopularity {
            count: raters.len(),
            avg_weight: total as f32 / raters.len() as f32,
        })
    }

    /// (users, listings, entries)
    pub fn counts(&self) -> (usize, usize, usize) {
        let entries = self.by_user.values().map(HashMap::len).sum();
        (self.by_user.len(), self.by_listing.len(), entries)
    }

    /// True when every entry is reachable from both views with the same weight
    pub fn is_consistent(&self) -> bool {
        let forward = self.by_user.iter().all(|(user, listings)| {
            listings.iter().all(|(listing, weight)| {
                self.by_listing
                    .get(listing)
                    .and_then(|raters| raters.get(user))
                    == Some(weight)
            })
        });
        let backward_entries: usize = self.by_listing.values().map(HashMap::len).sum();
        forward && backward_entries == self.counts().2
    }
}
