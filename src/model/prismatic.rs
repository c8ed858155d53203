//! Prismatic building model: a footprint extruded along vertical walls.
//!
//! In the image the roof sits where the footprint is; the walls appear as the
//! footprint boundary swept back from the base (the footprint moved by
//! `-projection * length`) to the roof. Shade is the base boundary swept along
//! the shade direction, minus the visible walls.

use crate::geometry::boolean::difference_of;
use crate::geometry::sweep::sweep_boundary;
use crate::geometry::{MultiPolygon, Point, Polygon};
use crate::model::{BuildingModel, Structure};
use crate::trace::trace_warn;
use crate::util::RoofShadeResult;

/// Extruded footprint with constant cross-section.
#[derive(Clone, Debug, PartialEq)]
pub struct PrismaticModel {
    footprint: Polygon,
    projection: Point,
    shade: Point,
}

impl PrismaticModel {
    pub fn new(footprint: Polygon, projection: Point, shade: Point) -> Self {
        Self {
            footprint,
            projection,
            shade,
        }
    }

    fn try_generate(&self, length: u32) -> RoofShadeResult<(MultiPolygon, MultiPolygon)> {
        let len = length as f64;
        let base = self.footprint.translated(-self.projection * len);
        let roof = MultiPolygon::from(self.footprint.clone());
        let projection = difference_of(&sweep_boundary(&base, self.projection, len)?, &roof)?;
        let shade = difference_of(&sweep_boundary(&base, self.shade, len)?, &projection)?;
        Ok((projection, shade))
    }
}

impl BuildingModel for PrismaticModel {
    fn footprint(&self) -> &Polygon {
        &self.footprint
    }

    fn projection_step(&self) -> Point {
        self.projection
    }

    fn shade_step(&self) -> Point {
        self.shade
    }

    fn generate(&self, length: u32) -> Structure {
        let (projection, shade) = match self.try_generate(length) {
            Ok(parts) => parts,
            Err(err) => {
                trace_warn!(
                    "prismatic_generate_degenerate",
                    length = length,
                    reason = err.to_string().as_str()
                );
                (MultiPolygon::empty(), MultiPolygon::empty())
            }
        };
        Structure::new(
            length,
            MultiPolygon::from(self.footprint.clone()),
            projection,
            shade,
            self.projection,
            self.shade,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::boolean::intersection_of;

    #[test]
    fn square_with_orthogonal_directions() {
        let model = PrismaticModel::new(
            Polygon::rect(0.0, 0.0, 20.0, 20.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
        );
        let s = model.generate(5);
        assert!((s.roof().area() - 400.0).abs() < 1e-6);
        assert!((s.projection().area() - 100.0).abs() < 0.05);
        assert!((s.shade().area() - 175.0).abs() < 0.05);
        let overlap = intersection_of(s.shade(), s.projection()).unwrap();
        assert!(overlap.area() < 1e-3);
    }

    #[test]
    fn zero_length_structure_has_no_walls() {
        let model = PrismaticModel::new(
            Polygon::rect(0.0, 0.0, 4.0, 4.0),
            Point::new(0.6, 0.8),
            Point::new(-0.5, 1.0),
        );
        let s = model.generate(0);
        assert!(s.projection().is_empty());
        assert!(s.shade().is_empty());
    }
}
