//! Roofshade reconstructs the roof, visible walls and cast shadow of a
//! building from overhead imagery.
//!
//! A rough footprint polygon and a projection/shade direction pair are turned
//! into candidate structures by a geometric model, scored against the image
//! with sparse directional-derivative kernels, and ranked per roof position
//! or by consensus over several views. Parallelism is available through the
//! `rayon` feature, image loading through `image-io`, and spans and events
//! through `tracing`.

mod candidate;
pub mod geometry;
pub mod image;
pub mod kernel;
pub mod lowlevel;
pub mod model;
pub mod pipeline;
pub mod search;
mod trace;
pub mod util;

pub use geometry::{BBox, MultiPolygon, Point, Polygon, Ring};
pub use image::{ImageView, OwnedImage, Tile};
pub use model::{
    BuildingModel, Estimates, ModelKind, ModelVariant, Precalculated, PrismaticModel,
    ScoringParams, Structure,
};
pub use pipeline::{
    BuildingFeature, FeatureReconstruction, MemoryRaster, RasterSource, ReconstructionConfig,
    Reconstructor, SharedRaster, ViewSource,
};
pub use search::{
    BaselinePolicy, Consensus, EstimationObserver, MultiviewEstimator, MultiviewModel,
    MultiviewResponse, RoofEstimator, RoofResponse, RoofSearchConfig, StructureCandidates,
    StructureEstimator, ViewGeometry,
};
pub use util::{RoofShadeError, RoofShadeResult};
