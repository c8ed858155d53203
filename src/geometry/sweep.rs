//! Sweeping polygons along a direction.
//!
//! Every edge `(a, b)` of a ring swept by `v` covers the quadrilateral
//! `a, b, b + v, a + v`. The union of these ribbons is the area the boundary
//! passes over. Ribbons are oriented counter-clockwise before the union so
//! that overlaps accumulate under the non-zero rule, and edges parallel to
//! `v` produce no ribbon at all.

use crate::geometry::boolean::union_rings;
use crate::geometry::{MultiPolygon, Point, Polygon, Ring, AREA_EPS};
use crate::util::RoofShadeResult;

fn ribbons<'a, I>(rings: I, offset: Point) -> Vec<Ring>
where
    I: IntoIterator<Item = &'a Ring>,
{
    let mut out = Vec::new();
    for ring in rings {
        for (a, b) in ring.edges() {
            let quad = Ring::new(vec![a, b, b + offset, a + offset]);
            let area = quad.signed_area();
            if area.abs() <= AREA_EPS {
                continue;
            }
            out.push(if area < 0.0 { quad.reversed() } else { quad });
        }
    }
    out
}

/// Area swept by the boundary of `polygon` moving by `step * length`.
///
/// Enclosed gaps are filled, so the result keeps exteriors only; disjoint
/// pieces are all kept.
pub fn sweep_boundary(polygon: &Polygon, step: Point, length: f64) -> RoofShadeResult<MultiPolygon> {
    let offset = step * length;
    let quads = ribbons(polygon.rings(), offset);
    Ok(union_rings(&quads)?.without_holes())
}

/// Area covered by `polygon` at any point of its move by `step * length`.
///
/// This is the boundary sweep together with the start and end positions.
pub fn sweep_solid(polygon: &Polygon, step: Point, length: f64) -> RoofShadeResult<MultiPolygon> {
    let offset = step * length;
    let mut rings = ribbons(polygon.rings(), offset);
    rings.push(polygon.exterior().clone());
    rings.push(polygon.exterior().translated(offset));
    Ok(union_rings(&rings)?.without_holes())
}
