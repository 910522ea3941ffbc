//! Bulk loading of parcels and listings from files.
//!
//! Parcels are read from a `GeoJSON` `FeatureCollection` whose features
//! carry the parcel attributes in `properties`. Listings are read from a
//! JSON array.

use std::path::Path;

use parcel_map_parcel_models::{Listing, NewParcel};
use serde::Serialize;

use crate::{EngineError, ParcelEngine};

/// Outcome of a parcel seed load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub inserted: usize,
    pub rejected: usize,
}

/// Converts one feature into a parcel submission.
///
/// The feature id is used as `parcel_id` when properties do not carry
/// one.
///
/// # Errors
///
/// Returns [`EngineError::Json`] if the feature has no geometry or its
/// properties do not describe a parcel.
pub fn feature_to_parcel(feature: &geojson::Feature) -> Result<NewParcel, EngineError> {
    let mut object = feature.properties.clone().unwrap_or_default();

    if !object.contains_key("parcel_id") {
        let id = match &feature.id {
            Some(geojson::feature::Id::String(s)) => Some(serde_json::Value::String(s.clone())),
            Some(geojson::feature::Id::Number(n)) => Some(serde_json::Value::String(n.to_string())),
            None => None,
        };
        if let Some(id) = id {
            object.insert("parcel_id".to_string(), id);
        }
    }

    let geometry = feature
        .geometry
        .as_ref()
        .map_or(Ok(serde_json::Value::Null), serde_json::to_value)?;
    object.insert("geometry".to_string(), geometry);

    Ok(serde_json::from_value(serde_json::Value::Object(object))?)
}

/// Inserts every parcel in a `GeoJSON` `FeatureCollection`.
///
/// Features are converted first; the valid ones are then inserted as one
/// batch so the spatial index is bulk loaded once. Features that fail to
/// convert or insert are logged and counted as rejected; they do not stop
/// the load.
///
/// # Errors
///
/// Returns [`EngineError::Json`] if `json` is not a `FeatureCollection`.
pub fn load_parcels_str(engine: &ParcelEngine, json: &str) -> Result<SeedReport, EngineError> {
    let collection: geojson::FeatureCollection = serde_json::from_str(json)?;
    let mut report = SeedReport::default();

    let mut parcels = Vec::with_capacity(collection.features.len());
    for (i, feature) in collection.features.iter().enumerate() {
        match feature_to_parcel(feature) {
            Ok(parcel) => parcels.push(parcel),
            Err(e) => {
                log::warn!("Skipping feature {i}: {e}");
                report.rejected += 1;
            }
        }
    }

    for result in engine.insert_many(parcels) {
        match result {
            Ok(handle) => {
                log::debug!("Seeded parcel {} (id {})", handle.parcel_id, handle.id);
                report.inserted += 1;
            }
            Err(e) => {
                log::warn!("Skipping parcel: {e}");
                report.rejected += 1;
            }
        }
    }

    log::info!(
        "Loaded {} parcels ({} rejected)",
        report.inserted,
        report.rejected
    );
    Ok(report)
}

/// Reads a `GeoJSON` file and inserts its parcels.
///
/// # Errors
///
/// Returns [`EngineError::Io`] if the file cannot be read, or
/// [`EngineError::Json`] if it is not a `FeatureCollection`.
pub fn load_parcels_file(
    engine: &ParcelEngine,
    path: impl AsRef<Path>,
) -> Result<SeedReport, EngineError> {
    let path = path.as_ref();
    log::info!("Loading parcels from {}", path.display());
    load_parcels_str(engine, &std::fs::read_to_string(path)?)
}

/// Reads a JSON array of listings.
///
/// # Errors
///
/// Returns [`EngineError::Io`] if the file cannot be read, or
/// [`EngineError::Json`] if it is not an array of listings.
pub fn load_listings_file(path: impl AsRef<Path>) -> Result<Vec<Listing>, EngineError> {
    let path = path.as_ref();
    let listings: Vec<Listing> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    log::info!("Loaded {} listings from {}", listings.len(), path.display());
    Ok(listings)
}
