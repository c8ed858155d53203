//! Planar geometry for footprints and generated structures.
//!
//! Rings are stored open (the closing vertex is implicit). `Polygon`
//! normalizes orientation on construction: the exterior is counter-clockwise
//! (positive signed area) and holes are clockwise, which keeps non-zero
//! boolean operations well defined. A `MultiPolygon` may be empty; that is
//! the value every degenerate operation degrades to.

use nalgebra::{Matrix3, Vector2};

pub mod boolean;
pub mod raster;
pub mod sweep;
pub mod transform;

/// Point or displacement in a planar frame.
pub type Point = Vector2<f64>;

/// Signed-area threshold under which a ring counts as degenerate.
pub(crate) const AREA_EPS: f64 = 1e-9;

/// Closed ring of vertices, stored without the repeated closing vertex.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ring {
    points: Vec<Point>,
}

impl Ring {
    /// Creates a ring, dropping a trailing vertex equal to the first one.
    pub fn new(mut points: Vec<Point>) -> Self {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self { points }
    }

    /// Creates a ring from coordinate pairs.
    pub fn from_coords(coords: &[(f64, f64)]) -> Self {
        Self::new(coords.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterates edges as `(start, end)` pairs including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        let count = if n < 2 { 0 } else { n };
        (0..count).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Shoelace signed area; positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        0.5 * self
            .edges()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum::<f64>()
    }

    /// Returns the ring with reversed vertex order.
    pub fn reversed(&self) -> Ring {
        let mut points = self.points.clone();
        points.reverse();
        Ring { points }
    }

    /// Returns the ring oriented counter-clockwise.
    pub fn oriented_ccw(&self) -> Ring {
        if self.signed_area() < 0.0 {
            self.reversed()
        } else {
            self.clone()
        }
    }

    /// Even-odd crossing test.
    pub fn contains(&self, p: Point) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Boundary points spaced at most `step` apart, vertices included.
    ///
    /// A non-positive step returns the vertices unchanged.
    pub fn segmentize(&self, step: f64) -> Vec<Point> {
        if step.is_nan() || step <= 0.0 {
            return self.points.clone();
        }
        let mut out = Vec::with_capacity(self.points.len());
        for (a, b) in self.edges() {
            let len = (b - a).norm();
            let pieces = (len / step).ceil().max(1.0) as usize;
            for k in 0..pieces {
                out.push(a + (b - a) * (k as f64 / pieces as f64));
            }
        }
        if out.is_empty() {
            out.extend_from_slice(&self.points);
        }
        out
    }

    pub fn translated(&self, shift: Point) -> Ring {
        Ring {
            points: self.points.iter().map(|p| p + shift).collect(),
        }
    }

    /// Applies an affine transform in homogeneous column form.
    pub fn transformed(&self, m: &Matrix3<f64>) -> Ring {
        Ring {
            points: self
                .points
                .iter()
                .map(|&p| transform::apply_affine(m, p))
                .collect(),
        }
    }

    pub fn bbox(&self) -> BBox {
        BBox::from_points(self.points.iter().copied())
    }
}

/// Polygon with optional holes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygon {
    exterior: Ring,
    holes: Vec<Ring>,
}

impl Polygon {
    /// Creates a polygon, orienting the exterior CCW and holes CW.
    pub fn new(exterior: Ring, holes: Vec<Ring>) -> Self {
        Self {
            exterior: exterior.oriented_ccw(),
            holes: holes.iter().map(|h| h.oriented_ccw().reversed()).collect(),
        }
    }

    /// Creates a hole-free polygon from coordinate pairs.
    pub fn from_coords(coords: &[(f64, f64)]) -> Self {
        Self::new(Ring::from_coords(coords), Vec::new())
    }

    /// Axis-aligned rectangle.
    pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self::from_coords(&[(x0, y0), (x1, y0), (x1, y1), (x0, y1)])
    }

    pub fn exterior(&self) -> &Ring {
        &self.exterior
    }

    pub fn holes(&self) -> &[Ring] {
        &self.holes
    }

    /// Exterior followed by holes.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> + '_ {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }

    /// Unsigned area with holes subtracted.
    pub fn area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(|h| h.signed_area().abs()).sum();
        (self.exterior.signed_area().abs() - holes).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.exterior.len() < 3
    }

    /// Even-odd containment across all rings.
    pub fn contains(&self, p: Point) -> bool {
        self.rings().filter(|r| r.contains(p)).count() % 2 == 1
    }

    pub fn translated(&self, shift: Point) -> Polygon {
        Polygon::new(
            self.exterior.translated(shift),
            self.holes.iter().map(|h| h.translated(shift)).collect(),
        )
    }

    /// Applies an affine transform; reflections are re-oriented.
    pub fn transformed(&self, m: &Matrix3<f64>) -> Polygon {
        Polygon::new(
            self.exterior.transformed(m),
            self.holes.iter().map(|h| h.transformed(m)).collect(),
        )
    }

    pub fn bbox(&self) -> BBox {
        self.exterior.bbox()
    }
}

/// Zero or more polygons.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiPolygon {
    polygons: Vec<Polygon>,
}

impl MultiPolygon {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self {
            polygons: polygons.into_iter().filter(|p| !p.is_empty()).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn area(&self) -> f64 {
        self.polygons.iter().map(Polygon::area).sum()
    }

    pub fn rings(&self) -> impl Iterator<Item = &Ring> + '_ {
        self.polygons.iter().flat_map(Polygon::rings)
    }

    pub fn contains(&self, p: Point) -> bool {
        self.polygons.iter().any(|poly| poly.contains(p))
    }

    /// Boundary sample points of every ring.
    pub fn segmentize(&self, step: f64) -> Vec<Point> {
        self.rings().flat_map(|r| r.segmentize(step)).collect()
    }

    pub fn translated(&self, shift: Point) -> MultiPolygon {
        MultiPolygon {
            polygons: self.polygons.iter().map(|p| p.translated(shift)).collect(),
        }
    }

    pub fn transformed(&self, m: &Matrix3<f64>) -> MultiPolygon {
        MultiPolygon {
            polygons: self.polygons.iter().map(|p| p.transformed(m)).collect(),
        }
    }

    pub fn bbox(&self) -> BBox {
        self.polygons
            .iter()
            .fold(BBox::empty(), |acc, p| acc.union(&p.bbox()))
    }

    /// Drops holes, keeping every exterior.
    pub fn without_holes(&self) -> MultiPolygon {
        MultiPolygon {
            polygons: self
                .polygons
                .iter()
                .map(|p| Polygon::new(p.exterior.clone(), Vec::new()))
                .collect(),
        }
    }

    /// Rebuilds polygons from a flat list of oriented rings.
    ///
    /// Rings sharing the orientation of the largest ring are exteriors; the
    /// rest are holes attached to the smallest exterior that contains them.
    pub(crate) fn from_oriented_rings(rings: Vec<Ring>) -> MultiPolygon {
        let rings: Vec<(Ring, f64)> = rings
            .into_iter()
            .filter(|r| r.len() >= 3)
            .map(|r| {
                let a = r.signed_area();
                (r, a)
            })
            .filter(|(_, a)| a.abs() > AREA_EPS)
            .collect();
        let Some(outer_sign) = rings
            .iter()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(_, a)| a.signum())
        else {
            return MultiPolygon::empty();
        };

        let (outers, holes): (Vec<_>, Vec<_>) =
            rings.into_iter().partition(|(_, a)| a.signum() == outer_sign);
        let mut assembled: Vec<(Ring, f64, Vec<Ring>)> = outers
            .into_iter()
            .map(|(r, a)| (r, a.abs(), Vec::new()))
            .collect();
        for (hole, _) in holes {
            let hole_box = hole.bbox();
            let owner = assembled
                .iter_mut()
                .filter(|(outer, _, _)| {
                    outer.bbox().contains_box(&hole_box)
                        && hole.points().iter().any(|&p| outer.contains(p))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((_, _, owned)) = owner {
                owned.push(hole);
            }
        }
        MultiPolygon::new(
            assembled
                .into_iter()
                .map(|(outer, _, holes)| Polygon::new(outer, holes))
                .collect(),
        )
    }
}

impl From<Polygon> for MultiPolygon {
    fn from(polygon: Polygon) -> Self {
        MultiPolygon::new(vec![polygon])
    }
}

/// Axis-aligned bounding box; empty when `min > max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn empty() -> Self {
        Self {
            min: Point::new(f64::INFINITY, f64::INFINITY),
            max: Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Self {
        points.into_iter().fold(Self::empty(), |acc, p| Self {
            min: acc.min.inf(&p),
            max: acc.max.sup(&p),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn contains_box(&self, other: &BBox) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    /// Grows the box by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> BBox {
        BBox {
            min: self.min - Point::new(margin, margin),
            max: self.max + Point::new(margin, margin),
        }
    }

    pub fn width(&self) -> f64 {
        (self.max.x - self.min.x).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.max.y - self.min.y).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{MultiPolygon, Point, Polygon, Ring};

    #[test]
    fn polygon_normalizes_orientation() {
        let cw = Ring::from_coords(&[(0.0, 0.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0)]);
        assert!(cw.signed_area() < 0.0);
        let hole = Ring::from_coords(&[(0.5, 0.5), (1.5, 0.5), (1.5, 1.5), (0.5, 1.5)]);
        let poly = Polygon::new(cw, vec![hole]);
        assert!(poly.exterior().signed_area() > 0.0);
        assert!(poly.holes()[0].signed_area() < 0.0);
        assert!((poly.area() - 3.0).abs() < 1e-12);
        assert!(!poly.contains(Point::new(1.0, 1.0)));
        assert!(poly.contains(Point::new(0.25, 1.0)));
    }

    #[test]
    fn ring_drops_closing_vertex() {
        let ring = Ring::from_coords(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn segmentize_respects_step() {
        let ring = Polygon::rect(0.0, 0.0, 4.0, 2.0).exterior().clone();
        let pts = ring.segmentize(1.0);
        assert_eq!(pts.len(), 12);
        for w in pts.windows(2) {
            assert!((w[1] - w[0]).norm() <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn from_oriented_rings_assigns_holes() {
        let outer = Ring::from_coords(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let hole = Ring::from_coords(&[(2.0, 2.0), (2.0, 4.0), (4.0, 4.0), (4.0, 2.0)]);
        let other = Ring::from_coords(&[(20.0, 0.0), (21.0, 0.0), (21.0, 1.0), (20.0, 1.0)]);
        let mp = MultiPolygon::from_oriented_rings(vec![hole, outer, other]);
        assert_eq!(mp.polygons().len(), 2);
        assert!((mp.area() - 97.0).abs() < 1e-9);
        assert!((mp.without_holes().area() - 101.0).abs() < 1e-9);
    }
}
