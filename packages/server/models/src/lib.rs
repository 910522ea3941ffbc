#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the parcel map server.
//!
//! Parcel, collection, and statistics bodies come from
//! `parcel_map_parcel_models`; this crate only holds the query-string
//! shapes and the server's own responses.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
    /// Number of parcels currently stored.
    pub parcels: usize,
}

/// Query parameters for `GET /api/parcels`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParcelQueryParams {
    /// Comma-separated region names.
    pub regions: Option<String>,
    /// Bounding box as `minX,minY,maxX,maxY`.
    pub bbox: Option<String>,
    pub limit: Option<usize>,
}

/// Query parameters for `GET /api/parcels/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    pub field: String,
    pub value: String,
    /// Comma-separated region names.
    pub regions: Option<String>,
}

/// Query parameters for `GET /api/external/stats`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticsParams {
    pub region: Option<String>,
}

/// Response to a successful `POST /api/parcels`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiParcelCreated {
    pub message: String,
    pub parcel_id: String,
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}
