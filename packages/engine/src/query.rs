//! Region, bounding-box, and attribute queries over the parcel store.
//!
//! Every multi-parcel query returns its features in ascending internal id
//! order and truncates at the limit after filtering.

use std::collections::BTreeSet;

use parcel_map_parcel_models::{
    BoundingBox, ParcelCollection, ParcelDetail, ParcelMeasurements, SearchField,
};
use parcel_map_spatial::SpatialIndex;
use serde::Deserialize;

use crate::store::{ParcelRecord, ParcelStore};
use crate::EngineError;

/// Result size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    /// Limit used when the caller does not supply one.
    pub default_limit: usize,
    /// Ceiling for caller-supplied limits.
    pub max_limit: usize,
    /// Fixed limit for attribute search.
    pub search_limit: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: 1000,
            max_limit: 5000,
            search_limit: 100,
        }
    }
}

impl QueryLimits {
    /// Resolves a caller-supplied limit, clamping it to `max_limit`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidLimit`] for a limit of zero.
    pub fn resolve(&self, requested: Option<usize>) -> Result<usize, EngineError> {
        match requested {
            None => Ok(self.default_limit.min(self.max_limit)),
            Some(0) => Err(EngineError::InvalidLimit),
            Some(n) => Ok(n.min(self.max_limit)),
        }
    }
}

/// Splits a comma-separated region list, trimming names and dropping
/// empty entries. `None` or an empty string means no region filter.
#[must_use]
pub fn parse_regions(regions: Option<&str>) -> BTreeSet<String> {
    regions
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parses `minX,minY,maxX,maxY`.
///
/// # Errors
///
/// Returns [`EngineError::InvalidBoundingBox`] if any part is not a
/// number, there are not exactly four parts, or the box is inverted.
pub fn parse_bbox(s: &str) -> Result<BoundingBox, EngineError> {
    let coords = s
        .split(',')
        .map(|p| {
            p.trim()
                .parse::<f64>()
                .map_err(|_| EngineError::invalid_bbox(format!("not a number: {:?}", p.trim())))
        })
        .collect::<Result<Vec<_>, _>>()?;

    bbox_from_coords(&coords)
}

/// Builds a bounding box from exactly four coordinates.
///
/// # Errors
///
/// Returns [`EngineError::InvalidBoundingBox`] for the wrong number of
/// coordinates, a non-finite coordinate, or `min > max` on either axis.
pub fn bbox_from_coords(coords: &[f64]) -> Result<BoundingBox, EngineError> {
    let &[west, south, east, north] = coords else {
        return Err(EngineError::invalid_bbox(format!(
            "expected 4 coordinates, got {}",
            coords.len()
        )));
    };

    let bbox = BoundingBox::new(west, south, east, north);
    check_bbox(&bbox)?;
    Ok(bbox)
}

fn check_bbox(bbox: &BoundingBox) -> Result<(), EngineError> {
    if bbox.is_well_formed() {
        Ok(())
    } else {
        Err(EngineError::invalid_bbox(format!(
            "min must not exceed max: {},{},{},{}",
            bbox.west, bbox.south, bbox.east, bbox.north
        )))
    }
}

fn parse_search_field(field: &str) -> Result<SearchField, EngineError> {
    field
        .parse()
        .map_err(|_| EngineError::UnknownSearchField {
            field: field.to_string(),
        })
}

/// Read-only view over a store and its spatial index.
///
/// Borrowing both at once means a query always sees a store and index that
/// agree with each other.
pub struct QueryEngine<'a> {
    store: &'a ParcelStore,
    index: &'a SpatialIndex,
    limits: QueryLimits,
}

impl<'a> QueryEngine<'a> {
    #[must_use]
    pub const fn new(store: &'a ParcelStore, index: &'a SpatialIndex, limits: QueryLimits) -> Self {
        Self {
            store,
            index,
            limits,
        }
    }

    /// Parcels whose region is in `regions` (exact match; empty means
    /// all), up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidLimit`] for a zero limit.
    pub fn by_region(
        &self,
        regions: &BTreeSet<String>,
        limit: Option<usize>,
    ) -> Result<ParcelCollection, EngineError> {
        let limit = self.limits.resolve(limit)?;

        let features = self
            .store
            .iter_by_region(regions)
            .take(limit)
            .map(ParcelRecord::to_feature)
            .collect::<Vec<_>>();

        log::debug!(
            "by_region regions={regions:?} limit={limit} -> {}",
            features.len()
        );
        Ok(ParcelCollection::new(features))
    }

    /// Parcels whose boundary intersects `bbox`, optionally restricted to
    /// `regions`, up to `limit`.
    ///
    /// The R-tree yields every parcel whose bounding box overlaps; each
    /// candidate is then tested against its actual boundary.
    ///
    /// # Errors
    ///
    /// * [`EngineError::InvalidBoundingBox`] if `bbox` is inverted or not
    ///   finite (checked before the index is consulted)
    /// * [`EngineError::InvalidLimit`] for a zero limit
    pub fn by_bbox(
        &self,
        bbox: &BoundingBox,
        regions: &BTreeSet<String>,
        limit: Option<usize>,
    ) -> Result<ParcelCollection, EngineError> {
        check_bbox(bbox)?;
        let limit = self.limits.resolve(limit)?;

        let mut candidates = self.index.query_intersecting(bbox);
        let candidate_count = candidates.len();
        candidates.sort_unstable();

        let features = candidates
            .into_iter()
            .filter_map(|id| self.store.get_by_internal_id(id))
            .filter(|r| r.geometry.intersects_bbox(bbox))
            .filter(|r| regions.is_empty() || regions.contains(&r.attributes.region))
            .take(limit)
            .map(ParcelRecord::to_feature)
            .collect::<Vec<_>>();

        log::debug!(
            "by_bbox bbox={bbox:?} regions={regions:?} candidates={candidate_count} -> {}",
            features.len()
        );
        Ok(ParcelCollection::new(features))
    }

    /// Case-insensitive substring search on one attribute, combined with
    /// an exact region filter. Returns at most `search_limit` parcels.
    ///
    /// Parcels with no value for `field` never match. The value is matched
    /// literally; `%` and `_` are not wildcards.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSearchField`] if `field` is not a
    /// [`SearchField`].
    pub fn search(
        &self,
        field: &str,
        value: &str,
        regions: &BTreeSet<String>,
    ) -> Result<ParcelCollection, EngineError> {
        let field = parse_search_field(field)?;
        Ok(self.search_field(field, value, regions))
    }

    fn search_field(
        &self,
        field: SearchField,
        value: &str,
        regions: &BTreeSet<String>,
    ) -> ParcelCollection {
        let needle = value.to_lowercase();

        let features = self
            .store
            .iter_by_region(regions)
            .filter(|r| {
                field_value(r, field).is_some_and(|v| v.to_lowercase().contains(&needle))
            })
            .take(self.limits.search_limit)
            .map(ParcelRecord::to_feature)
            .collect::<Vec<_>>();

        log::debug!("search {field}={value:?} regions={regions:?} -> {}", features.len());
        ParcelCollection::new(features)
    }

    /// Stored and recomputed measurements for one parcel.
    #[must_use]
    pub fn get_measurements(&self, parcel_id: &str) -> Option<ParcelMeasurements> {
        self.store
            .get_by_parcel_id(parcel_id)
            .map(ParcelRecord::measurements)
    }

    /// Full detail (attributes, geometry, recomputed measurements) for one
    /// parcel.
    #[must_use]
    pub fn get_detail(&self, parcel_id: &str) -> Option<ParcelDetail> {
        self.store
            .get_by_parcel_id(parcel_id)
            .map(ParcelRecord::to_detail)
    }
}

fn field_value(record: &ParcelRecord, field: SearchField) -> Option<&str> {
    let attrs = &record.attributes;
    match field {
        SearchField::OwnerName => attrs.owner_name.as_deref(),
        SearchField::ParcelId => Some(record.parcel_id.as_str()),
        SearchField::Address => attrs.address.as_deref(),
        SearchField::LandUse => attrs.land_use.as_deref(),
        SearchField::Region => Some(attrs.region.as_str()),
    }
}
