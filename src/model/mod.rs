//! Building models and the structures they generate.
//!
//! A model owns a footprint and two direction vectors and, for a given
//! extrusion length, generates a [`Structure`]: the roof, the visible wall
//! projection and the cast shade. Generation is pure; models are immutable
//! values that can be shared between threads.

use crate::geometry::transform::{apply_linear, translation};
use crate::geometry::{MultiPolygon, Point, Polygon};
use crate::util::math::max_abs_component;
use nalgebra::Matrix3;

pub mod precalc;
pub mod prismatic;
pub mod scoring;

pub use precalc::Precalculated;
pub use prismatic::PrismaticModel;
pub use scoring::{Estimates, ScoringKernels, ScoringParams};

/// Roof, projection and shade polygons for one extrusion length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Structure {
    length: u32,
    roof: MultiPolygon,
    projection: MultiPolygon,
    shade: MultiPolygon,
    projection_step: Point,
    shade_step: Point,
}

impl Structure {
    pub fn new(
        length: u32,
        roof: MultiPolygon,
        projection: MultiPolygon,
        shade: MultiPolygon,
        projection_step: Point,
        shade_step: Point,
    ) -> Self {
        Self {
            length,
            roof,
            projection,
            shade,
            projection_step,
            shade_step,
        }
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn roof(&self) -> &MultiPolygon {
        &self.roof
    }

    pub fn projection(&self) -> &MultiPolygon {
        &self.projection
    }

    pub fn shade(&self) -> &MultiPolygon {
        &self.shade
    }

    /// Projection direction at length 1 in this structure's frame.
    pub fn projection_step(&self) -> Point {
        self.projection_step
    }

    /// Shade direction at length 1 in this structure's frame.
    pub fn shade_step(&self) -> Point {
        self.shade_step
    }

    /// True when the structure carries no geometry at all.
    pub fn is_empty(&self) -> bool {
        self.roof.is_empty() && self.projection.is_empty() && self.shade.is_empty()
    }

    /// Shifts all polygons; directions are unchanged.
    pub fn translated(&self, shift: Point) -> Structure {
        Structure {
            length: self.length,
            roof: self.roof.translated(shift),
            projection: self.projection.translated(shift),
            shade: self.shade.translated(shift),
            projection_step: self.projection_step,
            shade_step: self.shade_step,
        }
    }

    fn mapped(&self, m: &Matrix3<f64>) -> Structure {
        let (projection_step, shade_step) =
            normalize_pair(apply_linear(m, self.projection_step), apply_linear(m, self.shade_step));
        Structure {
            length: self.length,
            roof: self.roof.transformed(m),
            projection: self.projection.transformed(m),
            shade: self.shade.transformed(m),
            projection_step,
            shade_step,
        }
    }

    /// Re-expresses the structure in tile pixels: `world_to_raster` first,
    /// then `tile_shift`.
    ///
    /// Directions go through the linear part and are rescaled by their joint
    /// largest component.
    pub fn to_raster(&self, world_to_raster: &Matrix3<f64>, tile_shift: Point) -> Structure {
        self.mapped(&(translation(tile_shift) * world_to_raster))
    }

    /// Inverse of [`Structure::to_raster`]: `tile_shift` first, then
    /// `raster_to_world`.
    pub fn to_world(&self, raster_to_world: &Matrix3<f64>, tile_shift: Point) -> Structure {
        self.mapped(&(raster_to_world * translation(tile_shift)))
    }
}

/// Divides both vectors by their largest absolute component.
pub(crate) fn normalize_pair(a: Point, b: Point) -> (Point, Point) {
    let norm = max_abs_component([a, b].iter());
    if norm > 0.0 {
        (a / norm, b / norm)
    } else {
        (a, b)
    }
}

/// Contract shared by building model variants.
pub trait BuildingModel: Send + Sync {
    /// Footprint the model extrudes.
    fn footprint(&self) -> &Polygon;

    /// Projection direction at length 1.
    fn projection_step(&self) -> Point;

    /// Shade direction at length 1.
    fn shade_step(&self) -> Point;

    /// Generates the structure for `length`.
    ///
    /// Boolean failures degrade to empty polygons rather than erroring.
    fn generate(&self, length: u32) -> Structure;
}

/// Available model variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModelVariant {
    /// Vertical walls of constant footprint.
    #[default]
    Prismatic,
}

/// Variant-dispatching building model.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelKind {
    Prismatic(PrismaticModel),
}

impl ModelKind {
    /// Builds a model of `variant` in the frame of the given inputs.
    pub fn new(variant: ModelVariant, footprint: Polygon, projection: Point, shade: Point) -> Self {
        match variant {
            ModelVariant::Prismatic => {
                ModelKind::Prismatic(PrismaticModel::new(footprint, projection, shade))
            }
        }
    }

    pub fn variant(&self) -> ModelVariant {
        match self {
            ModelKind::Prismatic(_) => ModelVariant::Prismatic,
        }
    }
}

impl BuildingModel for ModelKind {
    fn footprint(&self) -> &Polygon {
        match self {
            ModelKind::Prismatic(m) => m.footprint(),
        }
    }

    fn projection_step(&self) -> Point {
        match self {
            ModelKind::Prismatic(m) => m.projection_step(),
        }
    }

    fn shade_step(&self) -> Point {
        match self {
            ModelKind::Prismatic(m) => m.shade_step(),
        }
    }

    fn generate(&self, length: u32) -> Structure {
        match self {
            ModelKind::Prismatic(m) => m.generate(length),
        }
    }
}
