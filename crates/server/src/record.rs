use catalog::{Listing, ListingId};
use engine::{Candidate, CandidateSource};
use serde::Serialize;

/// A recommended listing as callers see it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingRecord {
    pub id: ListingId,
    pub price: f64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub area: f64,
    pub year_built: u32,
    pub property_type: &'static str,
    pub city: String,
    pub country: String,
    pub parking_spaces: u32,
    pub has_garage: bool,
    pub has_pool: bool,
    pub description: Option<String>,
    pub score: f32,
    pub source: CandidateSource,
}

impl ListingRecord {
    pub fn new(listing: Listing, candidate: &Candidate) -> Self {
        Self {
            id: listing.id,
            price: listing.price,
            bedrooms: listing.bedrooms,
            bathrooms: listing.bathrooms,
            area: listing.area,
            year_built: listing.year_built,
            property_type: listing.property_type.as_str(),
            city: listing.location.city,
            country: listing.location.country,
            parking_spaces: listing.parking_spaces,
            has_garage: listing.has_garage,
            has_pool: listing.has_pool,
            description: listing.description,
            score: candidate.score,
            source: candidate.source,
        }
    }
}
