//! Core domain types for the real-estate catalog.
//!
//! Listings and interactions are owned by the catalog. The recommendation
//! engines only ever hold derived projections of them (feature vectors,
//! interaction matrices) keyed by [`ListingId`].

use serde::{Deserialize, Serialize};

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a listing
pub type ListingId = u32;

/// Unique identifier for a user
pub type UserId = u32;

// =============================================================================
// Listing-related Types
// =============================================================================

/// Broad category of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    #[default]
    Residential,
    Commercial,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Residential => "residential",
            PropertyType::Commercial => "commercial",
        }
    }
}

/// City and country a listing is located in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub country: String,
}

impl Location {
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
        }
    }
}

/// A real-estate property record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub price: f64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    /// Floor area, in the unit the catalog was captured in
    pub area: f64,
    pub year_built: u32,
    #[serde(default)]
    pub parking_spaces: u32,
    #[serde(default)]
    pub property_type: PropertyType,
    #[serde(default)]
    pub has_garage: bool,
    #[serde(default)]
    pub has_pool: bool,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub description: Option<String>,
}

impl Listing {
    /// The six numeric attributes in feature order:
    /// price, bedrooms, bathrooms, area, year_built, parking_spaces.
    pub fn numeric_attributes(&self) -> [f64; 6] {
        [
            self.price,
            self.bedrooms as f64,
            self.bathrooms as f64,
            self.area,
            self.year_built as f64,
            self.parking_spaces as f64,
        ]
    }

    pub fn is_residential(&self) -> bool {
        self.property_type == PropertyType::Residential
    }
}

// =============================================================================
// Interaction Types
// =============================================================================

/// What a user did with a listing.
///
/// Variants are ordered from least to most informative, so `max` keeps the
/// strongest signal when the same pair is recorded twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    View,
    Like,
    Save,
}

impl InteractionKind {
    /// Fixed weight table: view=1, like=2, save=3
    pub const fn weight(self) -> u8 {
        match self {
            InteractionKind::View => 1,
            InteractionKind::Like => 2,
            InteractionKind::Save => 3,
        }
    }

    /// Largest weight any interaction can carry
    pub const MAX_WEIGHT: u8 = 3;
}

/// A recorded user action on a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: UserId,
    pub listing_id: ListingId,
    pub kind: InteractionKind,
    /// Unix timestamp when the interaction was recorded
    #[serde(default)]
    pub timestamp: i64,
}

impl Interaction {
    pub fn new(user_id: UserId, listing_id: ListingId, kind: InteractionKind) -> Self {
        Self {
            user_id,
            listing_id,
            kind,
            timestamp: 0,
        }
    }

    pub fn weight(&self) -> u8 {
        self.kind.weight()
    }
}

// =============================================================================
// Change Notifications
// =============================================================================

/// A mutation of the catalog that derived caches may need to react to
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    ListingCreated(Listing),
    ListingUpdated(Listing),
    ListingDeleted(ListingId),
    InteractionRecorded(Interaction),
}

impl CatalogEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CatalogEvent::ListingCreated(_) => "listing_created",
            CatalogEvent::ListingUpdated(_) => "listing_updated",
            CatalogEvent::ListingDeleted(_) => "listing_deleted",
            CatalogEvent::InteractionRecorded(_) => "interaction_recorded",
        }
    }
}
