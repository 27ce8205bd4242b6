//! Helper to build a [`UserContext`] from the catalog store.

use crate::types::UserContext;
use catalog::{CatalogStore, UserId};

/// Build a UserContext for a given user.
///
/// A user with no interactions gets an empty context rather than an
/// error: "no history" is a normal state for the strategies to handle.
pub fn build_user_context(store: &dyn CatalogStore, user_id: UserId) -> UserContext {
    let mut context = UserContext::new(user_id);

    for interaction in store.list_interactions(Some(user_id)) {
        // The store keeps one row per pair; max() guards stores that don't
        let weight = context.weights.entry(interaction.listing_id).or_insert(0);
        *weight = (*weight).max(interaction.weight());
        context.seen_listings.insert(interaction.listing_id);
    }

    context
}
