//! Low-level building blocks for custom reconstruction pipelines.
//!
//! These expose kernel generators, boolean geometry, transforms and peak
//! extraction for callers that assemble their own search beyond the
//! [`Reconstructor`](crate::Reconstructor) API.

pub use crate::candidate::nms::local_maxima;
pub use crate::candidate::peak::Peak;
pub use crate::geometry::boolean::{difference_of, intersection_of, union_of};
pub use crate::geometry::raster::for_each_pixel_inside;
pub use crate::geometry::sweep::{sweep_boundary, sweep_solid};
pub use crate::geometry::transform::{
    apply_affine, apply_linear, from_geo_transform, invert, linear_block, translation,
};
pub use crate::kernel::render::{render_boundary, render_segments};
pub use crate::kernel::{
    FirstDirectedDerivative, Gaussian, KernelFn, SecondDirectedDerivative, SparseKernel, SparseTap,
};
pub use crate::model::ScoringKernels;
