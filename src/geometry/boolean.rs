//! Boolean polygon operations backed by `clipper2`.
//!
//! Clipper works on integer coordinates, so operands are first mapped into a
//! local frame whose extent spans `LOCAL_EXTENT` units; that keeps precision
//! independent of whether the inputs are pixels, metres or degrees. All
//! operations use the non-zero fill rule, which matches the orientation
//! normalization done by `Polygon`.

use crate::geometry::{BBox, MultiPolygon, Point, Ring};
use crate::util::{RoofShadeError, RoofShadeResult};
use clipper2::{difference, intersect, union, Centi, FillRule};

const LOCAL_EXTENT: f64 = 1.0e5;

/// Maps operands into clipper's working frame and back.
struct LocalFrame {
    origin: Point,
    scale: f64,
}

impl LocalFrame {
    fn new(bbox: BBox) -> Self {
        let extent = bbox.width().max(bbox.height());
        let scale = if extent > 0.0 && extent.is_finite() {
            LOCAL_EXTENT / extent
        } else {
            1.0
        };
        let origin = if bbox.is_empty() { Point::zeros() } else { bbox.min };
        Self { origin, scale }
    }

    fn encode<'a, I>(&self, rings: I) -> Vec<Vec<(f64, f64)>>
    where
        I: IntoIterator<Item = &'a Ring>,
    {
        rings
            .into_iter()
            .filter(|r| r.len() >= 3)
            .map(|r| {
                r.points()
                    .iter()
                    .map(|p| {
                        let q = (p - self.origin) * self.scale;
                        (q.x, q.y)
                    })
                    .collect()
            })
            .collect()
    }

    fn decode(&self, paths: Vec<Vec<(f64, f64)>>) -> MultiPolygon {
        let rings = paths
            .into_iter()
            .map(|path| {
                Ring::new(
                    path.into_iter()
                        .map(|(x, y)| Point::new(x, y) / self.scale + self.origin)
                        .collect(),
                )
            })
            .collect();
        MultiPolygon::from_oriented_rings(rings)
    }
}

fn geometry_error<E: std::fmt::Debug>(err: E) -> RoofShadeError {
    RoofShadeError::Geometry {
        reason: format!("{err:?}"),
    }
}

/// Union of arbitrary oriented rings under the non-zero rule.
///
/// Rings are taken as given; callers orient them so overlapping pieces add up
/// instead of cancelling.
pub fn union_rings(rings: &[Ring]) -> RoofShadeResult<MultiPolygon> {
    if rings.iter().all(|r| r.len() < 3) {
        return Ok(MultiPolygon::empty());
    }
    let bbox = rings
        .iter()
        .fold(BBox::empty(), |acc, r| acc.union(&r.bbox()));
    let frame = LocalFrame::new(bbox);
    let mut subject = frame.encode(rings.iter());
    let first = subject.remove(0);
    let result: Vec<Vec<(f64, f64)>> = union::<Centi>(vec![first], subject, FillRule::NonZero)
        .map_err(geometry_error)?
        .into();
    Ok(frame.decode(result))
}

/// Union of two multipolygons.
pub fn union_of(a: &MultiPolygon, b: &MultiPolygon) -> RoofShadeResult<MultiPolygon> {
    let rings: Vec<Ring> = a.rings().chain(b.rings()).cloned().collect();
    union_rings(&rings)
}

/// Area of `subject` not covered by `clip`.
pub fn difference_of(subject: &MultiPolygon, clip: &MultiPolygon) -> RoofShadeResult<MultiPolygon> {
    if subject.is_empty() {
        return Ok(MultiPolygon::empty());
    }
    if clip.is_empty() {
        return Ok(subject.clone());
    }
    let frame = LocalFrame::new(subject.bbox().union(&clip.bbox()));
    let result: Vec<Vec<(f64, f64)>> = difference::<Centi>(
        frame.encode(subject.rings()),
        frame.encode(clip.rings()),
        FillRule::NonZero,
    )
    .map_err(geometry_error)?
    .into();
    Ok(frame.decode(result))
}

/// Area covered by both operands.
pub fn intersection_of(a: &MultiPolygon, b: &MultiPolygon) -> RoofShadeResult<MultiPolygon> {
    if a.is_empty() || b.is_empty() {
        return Ok(MultiPolygon::empty());
    }
    let frame = LocalFrame::new(a.bbox().union(&b.bbox()));
    let result: Vec<Vec<(f64, f64)>> = intersect::<Centi>(
        frame.encode(a.rings()),
        frame.encode(b.rings()),
        FillRule::NonZero,
    )
    .map_err(geometry_error)?
    .into();
    Ok(frame.decode(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;

    fn mp(p: Polygon) -> MultiPolygon {
        MultiPolygon::from(p)
    }

    #[test]
    fn difference_removes_overlap() {
        let a = mp(Polygon::rect(0.0, 0.0, 10.0, 10.0));
        let b = mp(Polygon::rect(5.0, 0.0, 15.0, 10.0));
        let d = difference_of(&a, &b).unwrap();
        assert!((d.area() - 50.0).abs() < 1e-3);
        assert!(intersection_of(&d, &b).unwrap().area() < 1e-3);
    }

    #[test]
    fn union_merges_overlapping_rings() {
        let rings = vec![
            Polygon::rect(0.0, 0.0, 2.0, 1.0).exterior().clone(),
            Polygon::rect(1.0, 0.0, 3.0, 1.0).exterior().clone(),
        ];
        let u = union_rings(&rings).unwrap();
        assert_eq!(u.polygons().len(), 1);
        assert!((u.area() - 3.0).abs() < 1e-3);
    }

    #[test]
    fn operations_keep_precision_in_geographic_frames() {
        let a = mp(Polygon::rect(37.60001, 55.70001, 37.60011, 55.70006));
        let b = mp(Polygon::rect(37.60006, 55.70001, 37.60016, 55.70006));
        let i = intersection_of(&a, &b).unwrap();
        let expected = 0.00005 * 0.00005;
        assert!((i.area() - expected).abs() < expected * 1e-3);
    }

    #[test]
    fn empty_operands_short_circuit() {
        let a = mp(Polygon::rect(0.0, 0.0, 1.0, 1.0));
        let empty = MultiPolygon::empty();
        assert!(intersection_of(&a, &empty).unwrap().is_empty());
        assert_eq!(difference_of(&a, &empty).unwrap(), a);
        assert!(union_rings(&[]).unwrap().is_empty());
    }
}
