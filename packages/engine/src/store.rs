//! Authoritative parcel storage.
//!
//! The store owns every parcel record. Records are keyed by an internal id
//! assigned at insert time; a second map enforces uniqueness of the
//! external `parcel_id`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use parcel_map_geometry::ValidPolygon;
use parcel_map_parcel_models::{
    BoundingBox, NewParcel, ParcelAttributes, ParcelDetail, ParcelFeature, ParcelMeasurements,
    ParcelProperties, ParcelUpdate,
};
use serde::Serialize;

use crate::EngineError;

/// A stored parcel.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelRecord {
    /// Internal id, assigned by the store and never reused.
    pub id: u64,
    pub parcel_id: String,
    pub geometry: ValidPolygon,
    pub attributes: ParcelAttributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ParcelRecord {
    /// Renders the record as a `GeoJSON` feature.
    #[must_use]
    pub fn to_feature(&self) -> ParcelFeature {
        ParcelFeature {
            id: self.parcel_id.clone(),
            geometry: self.geometry.to_geojson(),
            properties: ParcelProperties {
                parcel_id: self.parcel_id.clone(),
                attributes: self.attributes.clone(),
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
        }
    }

    /// Stored measurements next to the ones recomputed from the boundary.
    #[must_use]
    pub fn measurements(&self) -> ParcelMeasurements {
        ParcelMeasurements {
            stored_area_sqm: self.attributes.area_sqm,
            stored_perimeter_m: self.attributes.perimeter_m,
            calculated: self.geometry.measurements(),
        }
    }

    #[must_use]
    pub fn to_detail(&self) -> ParcelDetail {
        ParcelDetail {
            parcel_id: self.parcel_id.clone(),
            geometry: self.geometry.to_geojson(),
            attributes: self.attributes.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            measurements: self.geometry.measurements(),
        }
    }
}

/// What a successful insert hands back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParcelHandle {
    pub id: u64,
    pub parcel_id: String,
    pub bbox: BoundingBox,
}

/// Parcel records keyed by internal id.
#[derive(Debug, Default)]
pub struct ParcelStore {
    records: BTreeMap<u64, ParcelRecord>,
    by_parcel_id: BTreeMap<String, u64>,
    next_id: u64,
}

impl ParcelStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Validates and stores a new parcel.
    ///
    /// Nothing is modified unless the insert succeeds.
    ///
    /// # Errors
    ///
    /// * [`EngineError::DuplicateParcelId`] if `parcel_id` is already stored
    /// * [`EngineError::EmptyRegion`] if the region is blank
    /// * [`EngineError::InvalidGeometry`] if the boundary fails validation
    pub fn insert(&mut self, parcel: NewParcel) -> Result<ParcelHandle, EngineError> {
        self.insert_at(parcel, Utc::now())
    }

    pub(crate) fn insert_at(
        &mut self,
        parcel: NewParcel,
        now: DateTime<Utc>,
    ) -> Result<ParcelHandle, EngineError> {
        if self.by_parcel_id.contains_key(&parcel.parcel_id) {
            return Err(EngineError::DuplicateParcelId {
                parcel_id: parcel.parcel_id,
            });
        }
        if parcel.attributes.region.trim().is_empty() {
            return Err(EngineError::EmptyRegion);
        }

        let geometry = ValidPolygon::from_geojson(&parcel.geometry)?;

        let id = self.next_id.max(1);
        self.next_id = id + 1;

        let handle = ParcelHandle {
            id,
            parcel_id: parcel.parcel_id.clone(),
            bbox: geometry.bounding_box(),
        };

        self.by_parcel_id.insert(parcel.parcel_id.clone(), id);
        self.records.insert(
            id,
            ParcelRecord {
                id,
                parcel_id: parcel.parcel_id,
                geometry,
                attributes: parcel.attributes,
                created_at: now,
                updated_at: None,
            },
        );

        Ok(handle)
    }

    /// Applies a partial attribute update. Geometry is never touched.
    ///
    /// # Errors
    ///
    /// * [`EngineError::NotFound`] if no parcel has this `parcel_id`
    /// * [`EngineError::EmptyRegion`] if the update blanks the region
    pub fn update(
        &mut self,
        parcel_id: &str,
        update: ParcelUpdate,
    ) -> Result<&ParcelRecord, EngineError> {
        if update
            .region
            .as_deref()
            .is_some_and(|r| r.trim().is_empty())
        {
            return Err(EngineError::EmptyRegion);
        }

        let record = self
            .by_parcel_id
            .get(parcel_id)
            .and_then(|id| self.records.get_mut(id))
            .ok_or_else(|| EngineError::NotFound {
                parcel_id: parcel_id.to_string(),
            })?;

        let attrs = &mut record.attributes;
        if let Some(region) = update.region {
            attrs.region = region;
        }
        if update.district.is_some() {
            attrs.district = update.district;
        }
        if update.ward.is_some() {
            attrs.ward = update.ward;
        }
        if update.owner_name.is_some() {
            attrs.owner_name = update.owner_name;
        }
        if update.owner_id.is_some() {
            attrs.owner_id = update.owner_id;
        }
        if update.address.is_some() {
            attrs.address = update.address;
        }
        if update.land_use.is_some() {
            attrs.land_use = update.land_use;
        }
        if update.zoning.is_some() {
            attrs.zoning = update.zoning;
        }
        if update.valuation.is_some() {
            attrs.valuation = update.valuation;
        }
        record.updated_at = Some(Utc::now());

        Ok(record)
    }

    /// Removes a parcel, returning the record.
    pub fn remove(&mut self, parcel_id: &str) -> Option<ParcelRecord> {
        let id = self.by_parcel_id.remove(parcel_id)?;
        self.records.remove(&id)
    }

    #[must_use]
    pub fn get_by_parcel_id(&self, parcel_id: &str) -> Option<&ParcelRecord> {
        self.by_parcel_id
            .get(parcel_id)
            .and_then(|id| self.records.get(id))
    }

    #[must_use]
    pub fn get_by_internal_id(&self, id: u64) -> Option<&ParcelRecord> {
        self.records.get(&id)
    }

    /// Records in ascending internal id order whose region is in
    /// `regions`, compared exactly. An empty set matches every region.
    pub fn iter_by_region<'a>(
        &'a self,
        regions: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = &'a ParcelRecord> + 'a {
        self.records
            .values()
            .filter(move |r| regions.is_empty() || regions.contains(&r.attributes.region))
    }

    /// Every record in ascending internal id order.
    pub fn iter(&self) -> impl Iterator<Item = &ParcelRecord> {
        self.records.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn new_parcel(parcel_id: &str, region: &str, ring: &[(f64, f64)]) -> NewParcel {
        let mut coords: Vec<Vec<f64>> = ring.iter().map(|&(x, y)| vec![x, y]).collect();
        coords.push(coords[0].clone());

        NewParcel {
            parcel_id: parcel_id.to_string(),
            geometry: geojson::Geometry::new(geojson::Value::Polygon(vec![coords])),
            attributes: ParcelAttributes {
                region: region.to_string(),
                ..ParcelAttributes::default()
            },
        }
    }

    pub(crate) fn unit_square(parcel_id: &str, region: &str, x: f64, y: f64) -> NewParcel {
        new_parcel(
            parcel_id,
            region,
            &[(x, y), (x + 1.0, y), (x + 1.0, y + 1.0), (x, y + 1.0)],
        )
    }

    #[test]
    fn assigns_increasing_ids() {
        let mut store = ParcelStore::new();
        let a = store.insert(unit_square("A1", "A", 0.0, 0.0)).unwrap();
        let b = store.insert(unit_square("B1", "B", 2.0, 0.0)).unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(b.bbox, BoundingBox::new(2.0, 0.0, 3.0, 1.0));
        assert_eq!(store.get_by_internal_id(2).unwrap().parcel_id, "B1");
        assert!(store.get_by_parcel_id("A1").unwrap().updated_at.is_none());
    }

    #[test]
    fn duplicate_parcel_id_leaves_store_unchanged() {
        let mut store = ParcelStore::new();
        store.insert(unit_square("DSM001", "Dar es Salaam", 0.0, 0.0)).unwrap();

        let err = store
            .insert(unit_square("DSM001", "Arusha", 5.0, 5.0))
            .unwrap_err();

        assert!(matches!(err, EngineError::DuplicateParcelId { .. }));
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get_by_parcel_id("DSM001").unwrap().attributes.region,
            "Dar es Salaam"
        );
    }

    #[test]
    fn invalid_geometry_is_rejected_without_consuming_an_id() {
        let mut store = ParcelStore::new();
        let bowtie = new_parcel("X", "A", &[(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0)]);

        assert!(matches!(
            store.insert(bowtie),
            Err(EngineError::InvalidGeometry(_))
        ));
        assert!(store.is_empty());
        assert_eq!(store.insert(unit_square("Y", "A", 0.0, 0.0)).unwrap().id, 1);
    }

    #[test]
    fn blank_region_is_rejected() {
        let mut store = ParcelStore::new();
        assert!(matches!(
            store.insert(unit_square("X", "  ", 0.0, 0.0)),
            Err(EngineError::EmptyRegion)
        ));
    }

    #[test]
    fn region_iteration_is_exact_and_ordered() {
        let mut store = ParcelStore::new();
        store.insert(unit_square("1", "Arusha", 0.0, 0.0)).unwrap();
        store.insert(unit_square("2", "Dodoma", 1.0, 0.0)).unwrap();
        store.insert(unit_square("3", "arusha", 2.0, 0.0)).unwrap();
        store.insert(unit_square("4", "Arusha", 3.0, 0.0)).unwrap();

        let regions = BTreeSet::from(["Arusha".to_string()]);
        let ids: Vec<u64> = store.iter_by_region(&regions).map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 4]);

        let all = BTreeSet::new();
        assert_eq!(store.iter_by_region(&all).count(), 4);
    }

    #[test]
    fn update_changes_attributes_only() {
        let mut store = ParcelStore::new();
        store.insert(unit_square("P1", "A", 0.0, 0.0)).unwrap();
        let before = store.get_by_parcel_id("P1").unwrap().geometry.clone();

        let updated = store
            .update(
                "P1",
                ParcelUpdate {
                    owner_name: Some("Amina Juma".to_string()),
                    region: Some("B".to_string()),
                    ..ParcelUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.attributes.owner_name.as_deref(), Some("Amina Juma"));
        assert_eq!(updated.attributes.region, "B");
        assert!(updated.updated_at.is_some());
        assert_eq!(updated.geometry, before);

        assert!(matches!(
            store.update("missing", ParcelUpdate::default()),
            Err(EngineError::NotFound { .. })
        ));
        assert!(matches!(
            store.update(
                "P1",
                ParcelUpdate {
                    region: Some(String::new()),
                    ..ParcelUpdate::default()
                }
            ),
            Err(EngineError::EmptyRegion)
        ));
    }

    #[test]
    fn remove_frees_parcel_id() {
        let mut store = ParcelStore::new();
        store.insert(unit_square("P1", "A", 0.0, 0.0)).unwrap();

        let removed = store.remove("P1").unwrap();
        assert_eq!(removed.id, 1);
        assert!(store.get_by_parcel_id("P1").is_none());
        assert!(store.remove("P1").is_none());

        // Internal ids are never reused.
        assert_eq!(store.insert(unit_square("P1", "A", 0.0, 0.0)).unwrap().id, 2);
    }
}
