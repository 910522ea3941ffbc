#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Land parcel types shared by the query engine, the API server, and the
//! CLI.
//!
//! Parcels are serialized as `GeoJSON` features. The attribute keys inside
//! `properties` are `snake_case` to match the parcel registry's column
//! names, so unlike the other API types these are not camel-cased.

pub mod stats;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use stats::{
    AreaStatistics, Listing, ListingStatistics, ListingStatus, PlotStatistics, PriceRange,
    PriceStatistics, RegionSummary,
};

/// Square metres to acres.
pub const ACRES_PER_SQM: f64 = 0.000_247_105;

/// Square metres to hectares.
pub const HECTARES_PER_SQM: f64 = 0.0001;

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary (`minX`).
    pub west: f64,
    /// Southern latitude boundary (`minY`).
    pub south: f64,
    /// Eastern longitude boundary (`maxX`).
    pub east: f64,
    /// Northern latitude boundary (`maxY`).
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Whether every coordinate is finite and the minimum corner does not
    /// exceed the maximum corner on either axis.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        [self.west, self.south, self.east, self.north]
            .iter()
            .all(|v| v.is_finite())
            && self.west <= self.east
            && self.south <= self.north
    }

    /// Whether the point lies inside or on the edge of this box.
    #[must_use]
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.west && x <= self.east && y >= self.south && y <= self.north
    }
}

/// Attribute fields that may be matched by a text search.
///
/// Parsing from a query string is the only way a search field is chosen,
/// so anything outside this list is rejected before a query runs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SearchField {
    OwnerName,
    ParcelId,
    Address,
    LandUse,
    Region,
}

impl SearchField {
    /// Every searchable field.
    pub const ALL: &[Self] = &[
        Self::OwnerName,
        Self::ParcelId,
        Self::Address,
        Self::LandUse,
        Self::Region,
    ];
}

/// Administrative, ownership, and classification attributes of a parcel.
///
/// Everything about a parcel except its identifiers, boundary, and
/// timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParcelAttributes {
    /// Top-level administrative region. Never empty.
    pub region: String,
    pub district: Option<String>,
    pub ward: Option<String>,
    /// Area as recorded by the registry, in square metres.
    pub area_sqm: Option<f64>,
    /// Perimeter as recorded by the registry, in metres.
    pub perimeter_m: Option<f64>,
    pub owner_name: Option<String>,
    pub owner_id: Option<String>,
    pub address: Option<String>,
    pub land_use: Option<String>,
    pub zoning: Option<String>,
    /// Monetary valuation.
    pub valuation: Option<f64>,
}

/// A parcel submitted for creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewParcel {
    /// Externally visible identifier, unique across the registry.
    pub parcel_id: String,
    /// `GeoJSON` `Polygon` with a single outer ring.
    pub geometry: geojson::Geometry,
    #[serde(flatten)]
    pub attributes: ParcelAttributes,
}

/// A partial update of a parcel's non-geometric attributes.
///
/// `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParcelUpdate {
    pub region: Option<String>,
    pub district: Option<String>,
    pub ward: Option<String>,
    pub owner_name: Option<String>,
    pub owner_id: Option<String>,
    pub address: Option<String>,
    pub land_use: Option<String>,
    pub zoning: Option<String>,
    pub valuation: Option<f64>,
}

/// The `properties` object of a parcel feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelProperties {
    pub parcel_id: String,
    #[serde(flatten)]
    pub attributes: ParcelAttributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A single parcel as a `GeoJSON` feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct ParcelFeature {
    /// Same value as `properties.parcel_id`.
    pub id: String,
    pub geometry: geojson::Geometry,
    pub properties: ParcelProperties,
}

/// Result of every multi-parcel query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct ParcelCollection {
    pub features: Vec<ParcelFeature>,
    /// Number of features returned (not the number that matched before
    /// the limit was applied).
    pub total: usize,
}

impl ParcelCollection {
    /// Wraps a set of features, deriving `total` from their count.
    #[must_use]
    pub fn new(features: Vec<ParcelFeature>) -> Self {
        let total = features.len();
        Self { features, total }
    }

    /// Parcel identifiers of the returned features, in order.
    #[must_use]
    pub fn parcel_ids(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.id.as_str()).collect()
    }
}

/// Measurements recomputed from a parcel boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub area_sqm: f64,
    pub area_acres: f64,
    pub area_hectares: f64,
    pub perimeter_m: f64,
}

impl Measurements {
    /// Builds measurements from an area in square metres and a perimeter
    /// in metres, deriving acres and hectares.
    #[must_use]
    pub fn new(area_sqm: f64, perimeter_m: f64) -> Self {
        Self {
            area_sqm,
            area_acres: area_sqm * ACRES_PER_SQM,
            area_hectares: area_sqm * HECTARES_PER_SQM,
            perimeter_m,
        }
    }
}

/// Registry-recorded measurements next to the ones recomputed from the
/// boundary.
///
/// The two are never reconciled and can differ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParcelMeasurements {
    pub stored_area_sqm: Option<f64>,
    pub stored_perimeter_m: Option<f64>,
    pub calculated: Measurements,
}

/// Full detail view of a single parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelDetail {
    pub parcel_id: String,
    pub geometry: geojson::Geometry,
    #[serde(flatten)]
    pub attributes: ParcelAttributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Recomputed from the boundary; the stored values live in
    /// `attributes`.
    pub measurements: Measurements,
}
