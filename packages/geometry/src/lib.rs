#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parcel boundary validation and measurement.
//!
//! Parcel boundaries arrive as `GeoJSON` polygons in WGS84 longitude /
//! latitude. A [`ValidPolygon`] is a single-ring polygon that has passed
//! the closure, vertex-count, and self-intersection checks; everything
//! downstream (the spatial index, the query engine) only ever sees
//! validated polygons.
//!
//! Area and perimeter are geodesic (computed on the WGS84 ellipsoid), not
//! planar, since the coordinates are angular.

mod validate;

use geo::{BoundingRect, Coord, GeodesicArea, Intersects, LineString, Polygon, Rect};
use parcel_map_parcel_models::{BoundingBox, Measurements};
use thiserror::Error;

/// Reasons a parcel boundary is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// Fewer than three distinct vertices.
    #[error("polygon needs at least 3 distinct vertices, found {found}")]
    TooFewVertices { found: usize },

    /// First and last positions of a `GeoJSON` ring differ.
    #[error("polygon ring is not closed")]
    UnclosedRing,

    /// Two ring edges cross or overlap.
    #[error("polygon ring intersects itself")]
    SelfIntersection,

    #[error("polygon has a non-finite coordinate")]
    NonFiniteCoordinate,

    /// A `GeoJSON` position with fewer than two ordinates.
    #[error("position must have at least 2 coordinates, found {found}")]
    InvalidPosition { found: usize },

    #[error("polygons with interior rings are not supported")]
    HolesNotSupported,

    #[error("expected a Polygon geometry, found {kind}")]
    UnsupportedGeometry { kind: &'static str },
}

/// A single-ring polygon that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidPolygon {
    polygon: Polygon<f64>,
    bbox: BoundingBox,
}

impl ValidPolygon {
    /// Parses and validates a `GeoJSON` geometry.
    ///
    /// `GeoJSON` rings must repeat their first position at the end; a ring
    /// that does not is rejected rather than silently closed.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the geometry is not a `Polygon`, has
    /// interior rings, is not closed, or fails [`validate`].
    pub fn from_geojson(geometry: &geojson::Geometry) -> Result<Self, GeometryError> {
        Self::parse_geojson(geometry)
            .inspect_err(|e| log::debug!("Rejected GeoJSON polygon: {e}"))
    }

    fn parse_geojson(geometry: &geojson::Geometry) -> Result<Self, GeometryError> {
        let rings = match &geometry.value {
            geojson::Value::Polygon(rings) => rings,
            other => {
                return Err(GeometryError::UnsupportedGeometry {
                    kind: geojson_kind(other),
                });
            }
        };

        let outer = match rings.as_slice() {
            [] => return Err(GeometryError::TooFewVertices { found: 0 }),
            [outer] => outer,
            _ => return Err(GeometryError::HolesNotSupported),
        };

        let coords = outer
            .iter()
            .map(|position| match position.as_slice() {
                [x, y, ..] => Ok(Coord { x: *x, y: *y }),
                _ => Err(GeometryError::InvalidPosition {
                    found: position.len(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        if coords.len() > 1 && coords.first() != coords.last() {
            return Err(GeometryError::UnclosedRing);
        }

        validate(Polygon::new(LineString::new(coords), vec![]))
    }

    /// Builds a polygon from an outer ring, closing it if the last vertex
    /// does not repeat the first.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the ring fails [`validate`].
    pub fn from_ring(coords: Vec<(f64, f64)>) -> Result<Self, GeometryError> {
        validate(Polygon::new(coords.into(), vec![]))
    }

    /// The underlying polygon.
    #[must_use]
    pub const fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Serializes the polygon as a `GeoJSON` geometry.
    #[must_use]
    pub fn to_geojson(&self) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::from(&self.polygon))
    }

    /// Axis-aligned bounding box in the polygon's own coordinates.
    #[must_use]
    pub const fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    /// Geodesic area in square metres.
    #[must_use]
    pub fn area_geodesic(&self) -> f64 {
        self.polygon.geodesic_area_unsigned()
    }

    /// Geodesic perimeter in metres.
    #[must_use]
    pub fn perimeter_geodesic(&self) -> f64 {
        self.polygon.geodesic_perimeter()
    }

    /// Geodesic area (square metres, acres, hectares) and perimeter.
    #[must_use]
    pub fn measurements(&self) -> Measurements {
        let (perimeter_m, area_sqm) = self.polygon.geodesic_perimeter_area_unsigned();
        Measurements::new(area_sqm, perimeter_m)
    }

    /// Exact test of whether the polygon and the box share any point.
    ///
    /// Unlike comparing bounding boxes, this is false for a concave
    /// polygon whose box overlaps `bbox` while its boundary and interior
    /// stay clear of it.
    #[must_use]
    pub fn intersects_bbox(&self, bbox: &BoundingBox) -> bool {
        let rect = Rect::new(
            Coord {
                x: bbox.west,
                y: bbox.south,
            },
            Coord {
                x: bbox.east,
                y: bbox.north,
            },
        );
        self.polygon.intersects(&rect)
    }
}

/// Validates a polygon.
///
/// The exterior ring of a [`geo::Polygon`] is always closed, so closure is
/// only checked when parsing `GeoJSON` (see
/// [`ValidPolygon::from_geojson`]).
///
/// # Errors
///
/// Returns [`GeometryError`] if the polygon has interior rings, fewer than
/// three distinct vertices, a non-finite coordinate, or a self-intersecting
/// ring.
pub fn validate(polygon: Polygon<f64>) -> Result<ValidPolygon, GeometryError> {
    if !polygon.interiors().is_empty() {
        log::debug!(
            "Rejected polygon with {} interior rings",
            polygon.interiors().len()
        );
        return Err(GeometryError::HolesNotSupported);
    }

    validate::check_ring(polygon.exterior()).inspect_err(|e| {
        log::debug!(
            "Rejected polygon with {} ring positions: {e}",
            polygon.exterior().0.len()
        );
    })?;

    let bbox = polygon.bounding_rect().map_or_else(
        || BoundingBox::new(0.0, 0.0, 0.0, 0.0),
        |rect| BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y),
    );

    Ok(ValidPolygon { polygon, bbox })
}

const fn geojson_kind(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Metres per degree of latitude at the equator on WGS84.
    const M_PER_DEG_LAT: f64 = 110_574.272;
    /// Metres per degree of longitude at the equator on WGS84.
    const M_PER_DEG_LON: f64 = 111_319.491;

    fn geojson_polygon(value: serde_json::Value) -> geojson::Geometry {
        serde_json::from_value(value).unwrap()
    }

    fn square_at(lon: f64, lat: f64, side_m: f64) -> ValidPolygon {
        let dlon = side_m / M_PER_DEG_LON;
        let dlat = side_m / M_PER_DEG_LAT;
        ValidPolygon::from_ring(vec![
            (lon, lat),
            (lon + dlon, lat),
            (lon + dlon, lat + dlat),
            (lon, lat + dlat),
        ])
        .unwrap()
    }

    #[test]
    fn parses_closed_geojson_polygon() {
        let poly = ValidPolygon::from_geojson(&geojson_polygon(serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[39.28, -6.82], [39.29, -6.82], [39.29, -6.81], [39.28, -6.82]]]
        })))
        .unwrap();

        assert_eq!(poly.polygon().exterior().0.len(), 4);
        assert_eq!(poly.to_geojson().value, geojson::Value::from(poly.polygon()));
    }

    #[test]
    fn rejects_unclosed_geojson_ring() {
        let err = ValidPolygon::from_geojson(&geojson_polygon(serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]]
        })))
        .unwrap_err();
        assert_eq!(err, GeometryError::UnclosedRing);
    }

    #[test]
    fn from_ring_closes_implicitly() {
        let poly = ValidPolygon::from_ring(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]).unwrap();
        let ring = &poly.polygon().exterior().0;
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn rejects_holes_and_other_types() {
        let with_hole = geojson_polygon(serde_json::json!({
            "type": "Polygon",
            "coordinates": [
                [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]],
                [[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 1.0]]
            ]
        }));
        assert_eq!(
            ValidPolygon::from_geojson(&with_hole).unwrap_err(),
            GeometryError::HolesNotSupported
        );

        let point =
            geojson_polygon(serde_json::json!({"type": "Point", "coordinates": [0.0, 0.0]}));
        assert_eq!(
            ValidPolygon::from_geojson(&point).unwrap_err(),
            GeometryError::UnsupportedGeometry { kind: "Point" }
        );
    }

    #[test]
    fn validate_reports_rejection_reason() {
        let exterior: LineString<f64> =
            vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)].into();
        let hole: LineString<f64> = vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 1.0)].into();
        assert_eq!(
            validate(Polygon::new(exterior.clone(), vec![hole])).unwrap_err(),
            GeometryError::HolesNotSupported
        );

        let bowtie: LineString<f64> =
            vec![(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)].into();
        assert_eq!(
            validate(Polygon::new(bowtie, vec![])).unwrap_err(),
            GeometryError::SelfIntersection
        );

        assert!(validate(Polygon::new(exterior, vec![])).is_ok());
    }

    #[test]
    fn rejects_short_positions() {
        let bad = geojson_polygon(serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0], [1.0, 1.0], [0.0, 0.0]]]
        }));
        assert_eq!(
            ValidPolygon::from_geojson(&bad).unwrap_err(),
            GeometryError::InvalidPosition { found: 1 }
        );
    }

    #[test]
    fn bounding_box_contains_every_vertex() {
        let polygons = [
            square_at(39.2, -6.8, 250.0),
            ValidPolygon::from_ring(vec![(-3.0, 2.0), (5.0, -1.0), (4.0, 7.0), (0.5, 3.5)])
                .unwrap(),
            ValidPolygon::from_ring(vec![
                (0.0, 0.0),
                (2.0, 0.0),
                (2.0, 1.0),
                (1.0, 1.0),
                (1.0, 2.0),
                (0.0, 2.0),
            ])
            .unwrap(),
        ];

        for poly in &polygons {
            let bbox = poly.bounding_box();
            for c in &poly.polygon().exterior().0 {
                assert!(bbox.contains_point(c.x, c.y), "{c:?} outside {bbox:?}");
            }
        }
    }

    #[test]
    fn hectare_square_near_equator() {
        let m = square_at(0.0, 0.0, 100.0).measurements();

        // 0.5% tolerance covers the latitude-dependent metres-per-degree
        // drift across the square.
        assert!((m.area_sqm - 10_000.0).abs() < 50.0, "area {}", m.area_sqm);
        assert!((m.perimeter_m - 400.0).abs() < 2.0, "perimeter {}", m.perimeter_m);
        assert!((m.area_acres - m.area_sqm * 0.000_247_105).abs() < 1e-12);
        assert!((m.area_hectares - m.area_sqm * 0.0001).abs() < 1e-12);
    }

    #[test]
    fn measurement_accessors_agree() {
        let poly = square_at(39.2, -6.8, 500.0);
        let m = poly.measurements();
        assert!((poly.area_geodesic() - m.area_sqm).abs() < 1e-6);
        assert!((poly.perimeter_geodesic() - m.perimeter_m).abs() < 1e-6);
    }

    #[test]
    fn area_is_independent_of_winding() {
        let ccw = ValidPolygon::from_ring(vec![(0.0, 0.0), (0.01, 0.0), (0.01, 0.01), (0.0, 0.01)])
            .unwrap();
        let cw = ValidPolygon::from_ring(vec![(0.0, 0.0), (0.0, 0.01), (0.01, 0.01), (0.01, 0.0)])
            .unwrap();
        assert!((ccw.area_geodesic() - cw.area_geodesic()).abs() < 1e-6);
        assert!(ccw.area_geodesic() > 0.0);
    }

    #[test]
    fn exact_intersection_excludes_concave_notch() {
        // L-shape: bbox is [0,2]x[0,2] but the [1,2]x[1,2] quadrant is empty.
        let l_shape = ValidPolygon::from_ring(vec![
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 2.0),
            (0.0, 2.0),
        ])
        .unwrap();

        let in_notch = BoundingBox::new(1.5, 1.5, 1.9, 1.9);
        let touching_arm = BoundingBox::new(1.5, 0.5, 3.0, 0.8);
        let containing = BoundingBox::new(-1.0, -1.0, 3.0, 3.0);
        let inside = BoundingBox::new(0.2, 0.2, 0.4, 0.4);
        let far = BoundingBox::new(10.0, 10.0, 11.0, 11.0);

        assert!(!l_shape.intersects_bbox(&in_notch));
        assert!(l_shape.intersects_bbox(&touching_arm));
        assert!(l_shape.intersects_bbox(&containing));
        assert!(l_shape.intersects_bbox(&inside));
        assert!(!l_shape.intersects_bbox(&far));
    }
}
