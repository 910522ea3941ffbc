#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory bounding-box index for parcel lookups.
//!
//! Maps each parcel's internal id to its bounding box in an R-tree. The
//! index never holds geometry; callers keep the polygons and use the ids
//! returned here as a candidate set that still needs an exact
//! intersection test.

use std::collections::BTreeMap;

use parcel_map_parcel_models::BoundingBox;
use rstar::{AABB, RTree, RTreeObject};

/// A parcel id stored in the R-tree with its envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
struct IndexEntry {
    id: u64,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree of parcel bounding boxes keyed by internal parcel id.
///
/// Result order of [`SpatialIndex::query_intersecting`] is unspecified.
#[derive(Default)]
pub struct SpatialIndex {
    tree: RTree<IndexEntry>,
    /// id -> envelope, so entries can be removed by id alone.
    envelopes: BTreeMap<u64, AABB<[f64; 2]>>,
}

impl SpatialIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from `(id, bbox)` pairs in one pass.
    ///
    /// Later duplicates of an id replace earlier ones.
    #[must_use]
    pub fn bulk_load(entries: impl IntoIterator<Item = (u64, BoundingBox)>) -> Self {
        let envelopes: BTreeMap<u64, AABB<[f64; 2]>> = entries
            .into_iter()
            .map(|(id, bbox)| (id, to_envelope(&bbox)))
            .collect();

        let tree = RTree::bulk_load(
            envelopes
                .iter()
                .map(|(&id, &envelope)| IndexEntry { id, envelope })
                .collect(),
        );
        log::debug!("Bulk loaded {} parcels into spatial index", tree.size());

        Self { tree, envelopes }
    }

    /// Adds or replaces the entry for `id`.
    pub fn insert(&mut self, id: u64, bbox: &BoundingBox) {
        self.remove(id);

        let envelope = to_envelope(bbox);
        self.tree.insert(IndexEntry { id, envelope });
        self.envelopes.insert(id, envelope);
    }

    /// Removes the entry for `id`. Returns whether it was present.
    pub fn remove(&mut self, id: u64) -> bool {
        let Some(envelope) = self.envelopes.remove(&id) else {
            return false;
        };

        let removed = self.tree.remove(&IndexEntry { id, envelope }).is_some();
        if !removed {
            log::warn!("Spatial index entry for parcel {id} was missing from the R-tree");
        }
        removed
    }

    /// Ids whose bounding box overlaps `query` (edges touching counts).
    ///
    /// Candidates only: a parcel whose box overlaps `query` may still not
    /// intersect it.
    #[must_use]
    pub fn query_intersecting(&self, query: &BoundingBox) -> Vec<u64> {
        self.tree
            .locate_in_envelope_intersecting(&to_envelope(query))
            .map(|entry| entry.id)
            .collect()
    }

    /// Number of indexed parcels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }
}

fn to_envelope(bbox: &BoundingBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bbox.west, bbox.south], [bbox.east, bbox.north])
}
