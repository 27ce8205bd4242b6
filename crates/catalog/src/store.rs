//! The read interface the recommendation engines consume, plus a
//! thread-safe in-memory implementation that publishes change events.

use crate::types::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Read-only view of listings and interactions.
///
/// `Send + Sync` so one store can be shared by every engine behind an `Arc`.
pub trait CatalogStore: Send + Sync {
    /// All listings, ordered by id
    fn list_all_listings(&self) -> Vec<Listing>;

    /// A single listing, if it exists
    fn get_listing(&self, id: ListingId) -> Option<Listing>;

    /// Interactions for one user, or for everyone when `user_id` is `None`
    fn list_interactions(&self, user_id: Option<UserId>) -> Vec<Interaction>;
}

/// Receives catalog mutations.
///
/// Implemented by every engine that keeps a derived cache so the store can
/// push create/update/delete events instead of engines polling for changes.
pub trait CatalogObserver: Send + Sync {
    fn on_change(&self, event: &CatalogEvent);
}

#[derive(Debug, Default)]
struct CatalogData {
    listings: BTreeMap<ListingId, Listing>,
    /// One row per (user, listing) pair
    interactions: HashMap<(UserId, ListingId), Interaction>,
}

/// In-memory catalog store.
///
/// Holds listings keyed by id and at most one interaction per
/// (user, listing) pair. Observers are notified after the data lock is
/// released, so an observer may read back from the store while handling
/// an event.
#[derive(Default)]
pub struct InMemoryCatalog {
    data: RwLock<CatalogData>,
    observers: RwLock<Vec<Arc<dyn CatalogObserver>>>,
}

impl InMemoryCatalog {
    /// Creates a new, empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from already-parsed rows without emitting events.
    ///
    /// Repeated (user, listing) interactions collapse to the strongest kind.
    pub fn from_parts(listings: Vec<Listing>, interactions: Vec<Interaction>) -> Self {
        let mut data = CatalogData::default();
        for listing in listings {
            data.listings.insert(listing.id, listing);
        }
        for interaction in interactions {
            merge_interaction(&mut data.interactions, interaction);
        }
        Self {
            data: RwLock::new(data),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Register an observer for future mutations
    pub fn subscribe(&self, observer: Arc<dyn CatalogObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Insert a new listing or replace an existing one with the same id.
    ///
    /// Emits `ListingCreated` or `ListingUpdated` accordingly. A listing with
    /// a negative or non-finite price or area is rejected and emits nothing.
    pub fn upsert_listing(&self, listing: Listing) -> crate::Result<()> {
        check_listing(&listing)?;
        let existed = {
            let mut data = self.write_data();
            data.listings.insert(listing.id, listing.clone()).is_some()
        };
        let event = if existed {
            CatalogEvent::ListingUpdated(listing)
        } else {
            CatalogEvent::ListingCreated(listing)
        };
        self.notify(&event);
        Ok(())
    }

    /// Remove a listing and every interaction that references it.
    ///
    /// Returns the removed listing, or `None` (and emits nothing) if it was
    /// not in the catalog.
    pub fn delete_listing(&self, id: ListingId) -> Option<Listing> {
        let removed = {
            let mut data = self.write_data();
            let removed = data.listings.remove(&id);
            if removed.is_some() {
                data.interactions.retain(|(_, listing_id), _| *listing_id != id);
            }
            removed
        };
        if removed.is_some() {
            self.notify(&CatalogEvent::ListingDeleted(id));
        }
        removed
    }

    /// Record an interaction, keeping the most informative kind per pair.
    ///
    /// Fails with `MissingReference` if the listing does not exist.
    pub fn record_interaction(&self, interaction: Interaction) -> crate::Result<()> {
        {
            let mut data = self.write_data();
            if !data.listings.contains_key(&interaction.listing_id) {
                return Err(crate::CatalogError::MissingReference {
                    entity: "Listing".to_string(),
                    id: interaction.listing_id,
                });
            }
            merge_interaction(&mut data.interactions, interaction);
        }
        self.notify(&CatalogEvent::InteractionRecorded(interaction));
        Ok(())
    }

    /// Get counts for debugging/validation: (listings, interactions)
    pub fn counts(&self) -> (usize, usize) {
        let data = self.read_data();
        (data.listings.len(), data.interactions.len())
    }

    /// Check that every interaction references a known listing
    pub fn validate(&self) -> crate::Result<()> {
        let data = self.read_data();
        for (_, listing_id) in data.interactions.keys() {
            if !data.listings.contains_key(listing_id) {
                return Err(crate::CatalogError::MissingReference {
                    entity: "Listing".to_string(),
                    id: *listing_id,
                });
            }
        }
        data.listings.values().try_for_each(check_listing)
    }

    fn notify(&self, event: &CatalogEvent) {
        // Clone the list so observers run without the registry lock held
        let observers: Vec<Arc<dyn CatalogObserver>> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        debug!(
            "Dispatching {} to {} observers",
            event.name(),
            observers.len()
        );
        for observer in observers {
            observer.on_change(event);
        }
    }

    fn read_data(&self) -> std::sync::RwLockReadGuard<'_, CatalogData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_data(&self) -> std::sync::RwLockWriteGuard<'_, CatalogData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CatalogStore for InMemoryCatalog {
    fn list_all_listings(&self) -> Vec<Listing> {
        self.read_data().listings.values().cloned().collect()
    }

    fn get_listing(&self, id: ListingId) -> Option<Listing> {
        self.read_data().listings.get(&id).cloned()
    }

    fn list_interactions(&self, user_id: Option<UserId>) -> Vec<Interaction> {
        let data = self.read_data();
        let mut interactions: Vec<Interaction> = data
            .interactions
            .values()
            .filter(|i| user_id.is_none_or(|uid| i.user_id == uid))
            .copied()
            .collect();
        interactions.sort_by_key(|i| (i.user_id, i.listing_id));
        interactions
    }
}

/// Prices and areas must be finite and non-negative
fn check_listing(listing: &Listing) -> crate::Result<()> {
    for (field, value) in [("price", listing.price), ("area", listing.area)] {
        if !value.is_finite() || value < 0.0 {
            return Err(crate::CatalogError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

fn merge_interaction(
    interactions: &mut HashMap<(UserId, ListingId), Interaction>,
    interaction: Interaction,
) {
    interactions
        .entry((interaction.user_id, interaction.listing_id))
        .and_modify(|existing| {
            if interaction.kind > existing.kind {
                *existing = interaction;
            }
        })
        .or_insert(interaction);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn listing(id: ListingId, price: f64) -> Listing {
        Listing {
            id,
            price,
            bedrooms: 3,
            bathrooms: 2,
            area: 1500.0,
            year_built: 2010,
            parking_spaces: 1,
            property_type: PropertyType::Residential,
            has_garage: false,
            has_pool: false,
            location: Location::new("Lisbon", "Portugal"),
            description: None,
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<CatalogEvent>>,
    }

    impl CatalogObserver for RecordingObserver {
        fn on_change(&self, event: &CatalogEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn test_upsert_emits_created_then_updated() {
        let catalog = InMemoryCatalog::new();
        let observer = Arc::new(RecordingObserver::default());
        catalog.subscribe(observer.clone());

        catalog.upsert_listing(listing(1, 100_000.0)).unwrap();
        catalog.upsert_listing(listing(1, 120_000.0)).unwrap();

        let events = observer.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], CatalogEvent::ListingCreated(_)));
        assert!(matches!(events[1], CatalogEvent::ListingUpdated(ref l) if l.price == 120_000.0));
        assert_eq!(catalog.get_listing(1).unwrap().price, 120_000.0);
    }

    #[test]
    fn test_repeated_interaction_keeps_strongest_kind() {
        let catalog = InMemoryCatalog::from_parts(vec![listing(1, 1.0)], vec![]);

        catalog
            .record_interaction(Interaction::new(7, 1, InteractionKind::Save))
            .unwrap();
        catalog
            .record_interaction(Interaction::new(7, 1, InteractionKind::View))
            .unwrap();

        let interactions = catalog.list_interactions(Some(7));
        assert_eq!(interactions.len(), 1);
        assert_eq!(interactions[0].kind, InteractionKind::Save);
    }

    #[test]
    fn test_interaction_on_unknown_listing_is_rejected() {
        let catalog = InMemoryCatalog::new();
        let result = catalog.record_interaction(Interaction::new(1, 99, InteractionKind::Like));
        assert!(matches!(
            result,
            Err(crate::CatalogError::MissingReference { id: 99, .. })
        ));
    }

    #[test]
    fn test_delete_cascades_interactions() {
        let catalog = InMemoryCatalog::from_parts(
            vec![listing(1, 1.0), listing(2, 2.0)],
            vec![
                Interaction::new(1, 1, InteractionKind::Like),
                Interaction::new(1, 2, InteractionKind::View),
                Interaction::new(2, 1, InteractionKind::Save),
            ],
        );

        assert!(catalog.delete_listing(1).is_some());
        assert!(catalog.delete_listing(1).is_none());

        let interactions = catalog.list_interactions(None);
        assert_eq!(interactions.len(), 1);
        assert_eq!(interactions[0].listing_id, 2);
        assert_eq!(catalog.counts(), (1, 1));
    }

    #[test]
    fn test_validate_rejects_negative_price() {
        let catalog = InMemoryCatalog::from_parts(vec![listing(1, -5.0)], vec![]);
        assert!(matches!(
            catalog.validate(),
            Err(crate::CatalogError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_upsert_rejects_invalid_listing() {
        let catalog = InMemoryCatalog::new();
        let observer = Arc::new(RecordingObserver::default());
        catalog.subscribe(observer.clone());

        let mut bad = listing(1, f64::NAN);
        assert!(matches!(
            catalog.upsert_listing(bad.clone()),
            Err(crate::CatalogError::InvalidValue { ref field, .. }) if field == "price"
        ));
        bad.price = 100_000.0;
        bad.area = -1.0;
        assert!(matches!(
            catalog.upsert_listing(bad),
            Err(crate::CatalogError::InvalidValue { ref field, .. }) if field == "area"
        ));

        assert_eq!(catalog.counts(), (0, 0));
        assert!(observer.events.lock().unwrap().is_empty());
    }
}
