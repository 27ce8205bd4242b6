//! Loading a catalog snapshot from disk.
//!
//! A catalog directory holds two JSON documents:
//! - `listings.json`: an array of [`Listing`] objects
//! - `interactions.json`: an array of [`Interaction`] objects (optional)

use crate::error::{CatalogError, Result};
use crate::store::InMemoryCatalog;
use crate::types::*;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Parse a JSON array file into rows
fn parse_json_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CatalogError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => CatalogError::IoError(e),
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CatalogError::ParseError {
        file: path.display().to_string(),
        source,
    })
}

/// Parse `listings.json`
pub fn parse_listings(path: &Path) -> Result<Vec<Listing>> {
    parse_json_rows(path)
}

/// Parse `interactions.json`. A missing file means no interactions yet.
pub fn parse_interactions(path: &Path) -> Result<Vec<Interaction>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    parse_json_rows(path)
}

impl InMemoryCatalog {
    /// Load a catalog directory.
    ///
    /// Steps:
    /// 1. Parse listings and interactions in parallel
    /// 2. Build the store (repeated pairs collapse to the strongest kind)
    /// 3. Validate referential integrity
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        info!("Loading catalog from {:?}", data_dir);

        let listings_path = data_dir.join("listings.json");
        let interactions_path = data_dir.join("interactions.json");

        let (listings, interactions) = rayon::join(
            || parse_listings(&listings_path),
            || parse_interactions(&interactions_path),
        );
        let listings = listings?;
        let interactions = interactions?;

        info!(
            "Parsed {} listings and {} interactions",
            listings.len(),
            interactions.len()
        );

        let mut seen = std::collections::HashSet::with_capacity(listings.len());
        for listing in &listings {
            if !seen.insert(listing.id) {
                return Err(CatalogError::ValidationError(format!(
                    "duplicate listing id {}",
                    listing.id
                )));
            }
        }

        let catalog = InMemoryCatalog::from_parts(listings, interactions);
        catalog.validate()?;

        Ok(catalog)
    }
}
