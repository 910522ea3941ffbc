#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory parcel registry with spatial and attribute queries.
//!
//! [`ParcelEngine`] owns a [`ParcelStore`] and a [`SpatialIndex`] behind a
//! single read-write lock. Queries take the shared lock for the index
//! lookup, exact intersection refinement, and record copies; inserts and
//! removals take the exclusive lock and update the store and the index
//! together, so a reader never sees a parcel in one but not the other.
//!
//! The returned collections are owned values, so callers serialize them
//! after the lock has been released.

pub mod error;
pub mod query;
pub mod seed;
pub mod stats;
pub mod store;

use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use parcel_map_parcel_models::{
    BoundingBox, Listing, NewParcel, ParcelCollection, ParcelDetail, ParcelMeasurements,
    ParcelUpdate, PlotStatistics, RegionSummary,
};
use parcel_map_spatial::SpatialIndex;

pub use error::{EngineError, ErrorClass};
pub use query::{QueryEngine, QueryLimits, parse_bbox, parse_regions};
pub use stats::StatisticsAggregator;
pub use store::{ParcelHandle, ParcelRecord, ParcelStore};

struct Registry {
    store: ParcelStore,
    index: SpatialIndex,
}

/// Shared parcel registry.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct ParcelEngine {
    registry: RwLock<Registry>,
    limits: QueryLimits,
}

impl Default for ParcelEngine {
    fn default() -> Self {
        Self::new(QueryLimits::default())
    }
}

impl ParcelEngine {
    #[must_use]
    pub fn new(limits: QueryLimits) -> Self {
        Self {
            registry: RwLock::new(Registry {
                store: ParcelStore::new(),
                index: SpatialIndex::new(),
            }),
            limits,
        }
    }

    #[must_use]
    pub const fn limits(&self) -> QueryLimits {
        self.limits
    }

    // A panic while holding the lock cannot leave the store and index out
    // of step: every write validates before mutating either.
    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validates and stores a parcel, then indexes its bounding box.
    ///
    /// # Errors
    ///
    /// * [`EngineError::DuplicateParcelId`] if `parcel_id` is taken
    /// * [`EngineError::InvalidGeometry`] if the boundary is invalid
    /// * [`EngineError::EmptyRegion`] if the region is blank
    ///
    /// On error neither the store nor the index is changed.
    pub fn insert(&self, parcel: NewParcel) -> Result<ParcelHandle, EngineError> {
        let mut registry = self.write();
        let handle = registry.store.insert(parcel)?;
        registry.index.insert(handle.id, &handle.bbox);
        drop(registry);

        log::info!("Inserted parcel {} (id {})", handle.parcel_id, handle.id);
        Ok(handle)
    }

    /// Inserts a batch of parcels under one exclusive lock, then rebuilds
    /// the spatial index in a single bulk load.
    ///
    /// Each parcel succeeds or fails on its own; the results are returned
    /// in input order. Readers see either none or all of the batch.
    pub fn insert_many(
        &self,
        parcels: impl IntoIterator<Item = NewParcel>,
    ) -> Vec<Result<ParcelHandle, EngineError>> {
        let mut registry = self.write();
        let results: Vec<_> = parcels
            .into_iter()
            .map(|parcel| registry.store.insert(parcel))
            .collect();

        let index = SpatialIndex::bulk_load(
            registry
                .store
                .iter()
                .map(|r| (r.id, r.geometry.bounding_box())),
        );
        registry.index = index;
        let indexed = registry.index.len();
        drop(registry);

        log::info!(
            "Inserted {} of {} parcels; index holds {indexed}",
            results.iter().filter(|r| r.is_ok()).count(),
            results.len()
        );
        results
    }

    /// Updates non-geometric attributes. The spatial index is untouched.
    ///
    /// # Errors
    ///
    /// * [`EngineError::NotFound`] if no parcel has this `parcel_id`
    /// * [`EngineError::EmptyRegion`] if the update blanks the region
    pub fn update(
        &self,
        parcel_id: &str,
        update: ParcelUpdate,
    ) -> Result<ParcelDetail, EngineError> {
        let mut registry = self.write();
        let detail = registry.store.update(parcel_id, update)?.to_detail();
        drop(registry);

        log::info!("Updated parcel {parcel_id}");
        Ok(detail)
    }

    /// Removes a parcel from both the store and the index.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if no parcel has this
    /// `parcel_id`.
    pub fn remove(&self, parcel_id: &str) -> Result<ParcelHandle, EngineError> {
        let mut registry = self.write();
        let record = registry
            .store
            .remove(parcel_id)
            .ok_or_else(|| EngineError::NotFound {
                parcel_id: parcel_id.to_string(),
            })?;
        registry.index.remove(record.id);
        drop(registry);

        log::info!("Removed parcel {} (id {})", record.parcel_id, record.id);
        Ok(ParcelHandle {
            id: record.id,
            bbox: record.geometry.bounding_box(),
            parcel_id: record.parcel_id,
        })
    }

    /// See [`QueryEngine::by_region`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidLimit`] for a zero limit.
    pub fn by_region(
        &self,
        regions: &BTreeSet<String>,
        limit: Option<usize>,
    ) -> Result<ParcelCollection, EngineError> {
        let registry = self.read();
        QueryEngine::new(&registry.store, &registry.index, self.limits).by_region(regions, limit)
    }

    /// See [`QueryEngine::by_bbox`]. The box is checked before the lock is
    /// taken.
    ///
    /// # Errors
    ///
    /// * [`EngineError::InvalidBoundingBox`] for an inverted or non-finite
    ///   box
    /// * [`EngineError::InvalidLimit`] for a zero limit
    pub fn by_bbox(
        &self,
        bbox: &BoundingBox,
        regions: &BTreeSet<String>,
        limit: Option<usize>,
    ) -> Result<ParcelCollection, EngineError> {
        let bbox = query::bbox_from_coords(&[bbox.west, bbox.south, bbox.east, bbox.north])?;
        let registry = self.read();
        QueryEngine::new(&registry.store, &registry.index, self.limits)
            .by_bbox(&bbox, regions, limit)
    }

    /// See [`QueryEngine::search`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSearchField`] if `field` is not
    /// searchable.
    pub fn search(
        &self,
        field: &str,
        value: &str,
        regions: &BTreeSet<String>,
    ) -> Result<ParcelCollection, EngineError> {
        let registry = self.read();
        QueryEngine::new(&registry.store, &registry.index, self.limits)
            .search(field, value, regions)
    }

    #[must_use]
    pub fn get_measurements(&self, parcel_id: &str) -> Option<ParcelMeasurements> {
        let registry = self.read();
        QueryEngine::new(&registry.store, &registry.index, self.limits).get_measurements(parcel_id)
    }

    #[must_use]
    pub fn get_detail(&self, parcel_id: &str) -> Option<ParcelDetail> {
        let registry = self.read();
        QueryEngine::new(&registry.store, &registry.index, self.limits).get_detail(parcel_id)
    }

    /// See [`StatisticsAggregator::regions_summary`].
    #[must_use]
    pub fn regions_summary(&self, listings: &[Listing]) -> Vec<RegionSummary> {
        let registry = self.read();
        StatisticsAggregator::new(&registry.store).regions_summary(listings)
    }

    /// See [`StatisticsAggregator::plot_statistics`].
    #[must_use]
    pub fn plot_statistics(&self, listings: &[Listing], region: Option<&str>) -> PlotStatistics {
        let registry = self.read();
        StatisticsAggregator::new(&registry.store).plot_statistics(listings, region)
    }

    /// Number of stored parcels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().store.is_empty()
    }
}
