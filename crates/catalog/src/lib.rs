//! # Catalog Crate
//!
//! Listings, user interactions and the store the recommendation engines
//! read from.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Listing, Interaction, CatalogEvent)
//! - **store**: The `CatalogStore` read interface, `CatalogObserver` change
//!   notifications and the thread-safe `InMemoryCatalog`
//! - **loader**: Parse `listings.json` / `interactions.json` from a directory
//! - **error**: Error types for loading and validation
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::{CatalogStore, InMemoryCatalog};
//! use std::path::Path;
//!
//! let catalog = InMemoryCatalog::load_from_dir(Path::new("data/catalog"))?;
//! let listings = catalog.list_all_listings();
//! let history = catalog.list_interactions(Some(1));
//! ```

pub mod error;
pub mod loader;
pub mod store;
pub mod types;

pub use error::{CatalogError, Result};
pub use store::{CatalogObserver, CatalogStore, InMemoryCatalog};
pub use types::{
    // Type aliases
    ListingId,
    UserId,
    // Core types
    CatalogEvent,
    Interaction,
    InteractionKind,
    Listing,
    Location,
    PropertyType,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_creation() {
        let catalog = InMemoryCatalog::new();
        assert_eq!(catalog.counts(), (0, 0));
        assert!(catalog.list_all_listings().is_empty());
        assert!(catalog.list_interactions(None).is_empty());
    }

    #[test]
    fn test_interaction_weights() {
        assert_eq!(InteractionKind::View.weight(), 1);
        assert_eq!(InteractionKind::Like.weight(), 2);
        assert_eq!(InteractionKind::Save.weight(), 3);
        assert!(InteractionKind::Save > InteractionKind::Like);
    }

    #[test]
    fn test_numeric_attribute_order() {
        let listing = Listing {
            id: 1,
            price: 250_000.0,
            bedrooms: 2,
            bathrooms: 1,
            area: 900.0,
            year_built: 1999,
            parking_spaces: 3,
            property_type: PropertyType::Commercial,
            has_garage: true,
            has_pool: false,
            location: Location::default(),
            description: Some("Corner unit".to_string()),
        };
        assert_eq!(
            listing.numeric_attributes(),
            [250_000.0, 2.0, 1.0, 900.0, 1999.0, 3.0]
        );
        assert!(!listing.is_residential());
    }
}
