//! Ring checks applied before a polygon is accepted.

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Coord, Line, LineString};

use crate::GeometryError;

/// Rejects rings with fewer than three distinct vertices or with edges
/// that cross or overlap.
///
/// `ring` is expected to be closed (as every ring inside a
/// [`geo::Polygon`] is).
pub(crate) fn check_ring(ring: &LineString<f64>) -> Result<(), GeometryError> {
    if ring.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(GeometryError::NonFiniteCoordinate);
    }

    let mut vertices: Vec<Coord<f64>> = ring.0.clone();
    vertices.dedup();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }

    let distinct = count_distinct(&vertices);
    if distinct < 3 {
        return Err(GeometryError::TooFewVertices { found: distinct });
    }

    if has_self_intersection(&vertices) {
        return Err(GeometryError::SelfIntersection);
    }

    Ok(())
}

fn count_distinct(vertices: &[Coord<f64>]) -> usize {
    let mut seen: Vec<Coord<f64>> = Vec::with_capacity(vertices.len());
    for v in vertices {
        if !seen.contains(v) {
            seen.push(*v);
        }
    }
    seen.len()
}

/// `vertices` is the open ring (closing vertex removed, no consecutive
/// duplicates).
fn has_self_intersection(vertices: &[Coord<f64>]) -> bool {
    let n = vertices.len();
    let edges: Vec<Line<f64>> = (0..n)
        .map(|i| Line::new(vertices[i], vertices[(i + 1) % n]))
        .collect();

    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            let Some(hit) = line_intersection(edges[i], edges[j]) else {
                continue;
            };

            match hit {
                // Neighbouring edges always share their common vertex.
                LineIntersection::SinglePoint { .. } if adjacent => {}
                LineIntersection::SinglePoint { .. } => return true,
                LineIntersection::Collinear { intersection } => {
                    if !adjacent || intersection.start != intersection.end {
                        return true;
                    }
                }
            }
        }
    }

    false
}
