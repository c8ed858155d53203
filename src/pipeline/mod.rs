//! End-to-end reconstruction of building features from rasters.
//!
//! For each feature a tile is cut around the footprint, the roof is located,
//! extrusion lengths are swept and one structure is chosen automatically.
//! Results are returned in world coordinates.

use crate::geometry::transform::{apply_linear, invert, linear_block};
use crate::geometry::{BBox, MultiPolygon, Point, Polygon};
use crate::image::Tile;
use crate::model::{ModelKind, ModelVariant, ScoringParams};
use crate::search::{
    choose_multiview, choose_single_view, BaselinePolicy, EstimationObserver, MultiviewEstimator,
    MultiviewModel, RoofEstimator, RoofSearchConfig, StructureEstimator, ViewGeometry,
};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::math::max_abs_component;
use crate::util::{RoofShadeError, RoofShadeResult};
use nalgebra::Matrix3;
use std::sync::Arc;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

pub mod raster;

pub use raster::{MemoryRaster, RasterSource, SharedRaster};

/// A building to reconstruct.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildingFeature {
    pub id: u64,
    /// Footprint in world coordinates.
    pub footprint: Polygon,
    /// Projection direction in world units.
    pub projection: Point,
    /// Shade direction in world units.
    pub shade: Point,
    /// Per-feature override of [`ReconstructionConfig::max_length`].
    pub max_length: Option<u32>,
}

/// Tunables for [`Reconstructor`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReconstructionConfig {
    /// Spacing of boundary samples in pixels.
    pub segmentize_step: f64,
    /// Stride of the length sweep.
    pub projection_step: u32,
    /// Half-size of the roof search square in world units.
    pub position_walk: f64,
    /// Number of roof candidates kept.
    pub roof_variants: usize,
    /// Number of lengths kept per roof candidate.
    pub shade_variants: usize,
    /// Largest extrusion length, in pixels along the projection.
    pub max_length: u32,
    /// Extra pixels around the tile window.
    pub tile_margin: usize,
    /// Reconstruct features concurrently when the `rayon` feature is on.
    pub parallel: bool,
    pub variant: ModelVariant,
    pub baseline: BaselinePolicy,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            segmentize_step: 1.0,
            projection_step: 1,
            position_walk: 15.0,
            roof_variants: 20,
            shade_variants: 5,
            max_length: 70,
            tile_margin: 10,
            parallel: true,
            variant: ModelVariant::Prismatic,
            baseline: BaselinePolicy::ForcedPriority,
        }
    }
}

/// Chosen structure of one feature, in world coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureReconstruction {
    pub id: u64,
    pub length: u32,
    pub value: f64,
    /// Darkness weight of the chosen shade; 0 when no view scored it.
    pub shade_weight: f64,
    pub roof: MultiPolygon,
    pub projection: MultiPolygon,
    pub shade: MultiPolygon,
}

/// One view of a feature for multiview reconstruction.
pub struct ViewSource<'a> {
    pub raster: &'a dyn RasterSource,
    /// Footprint in this view's world frame; `None` when the view lacks it.
    pub footprint: Option<Polygon>,
    pub projection: Point,
    pub shade: Point,
}

/// Pixel window `(x, y, width, height)` of a raster.
type Window = (usize, usize, usize, usize);

/// Runs the reconstruction stages with one configuration.
#[derive(Clone, Default)]
pub struct Reconstructor {
    config: ReconstructionConfig,
    observer: Option<Arc<dyn EstimationObserver>>,
}

impl Reconstructor {
    pub fn new(config: ReconstructionConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    /// Forwards evaluation events of every stage to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn EstimationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    fn scoring_params(&self) -> ScoringParams {
        ScoringParams {
            segmentize_step: self.config.segmentize_step,
            ..ScoringParams::default()
        }
    }

    /// Reconstructs one feature on a single raster.
    ///
    /// Returns `Ok(None)` when the roof search finds no candidate.
    pub fn reconstruct_feature<R: RasterSource + ?Sized>(
        &self,
        raster: &R,
        feature: &BuildingFeature,
    ) -> RoofShadeResult<Option<FeatureReconstruction>> {
        let _span = trace_span!("reconstruct_feature", id = feature.id).entered();
        let max_length = feature.max_length.unwrap_or(self.config.max_length).max(1);
        let raster_to_world = raster.raster_to_world();
        let world_to_raster = invert(&raster_to_world)?;

        let norm = max_abs_component(
            [
                apply_linear(&world_to_raster, feature.projection),
                apply_linear(&world_to_raster, feature.shade),
            ]
            .iter(),
        );
        if norm <= 0.0 {
            return Err(RoofShadeError::DegenerateFootprint {
                reason: "projection and shade directions are zero",
            });
        }
        let (projection, shade) = (feature.projection / norm, feature.shade / norm);

        let window = self.tile_window(
            raster,
            &world_to_raster,
            &feature.footprint,
            projection,
            shade,
            max_length,
        )?;
        let tile = raster.read_window(window.0, window.1, window.2, window.3)?;
        let gray = tile.to_gray()?;
        let tile_top_left = Point::new(window.0 as f64, window.1 as f64);

        let roof_config = RoofSearchConfig {
            position_walk: self.config.position_walk,
            max_length: max_length as f64,
            ..RoofSearchConfig::default()
        };
        let mut roof_estimator =
            RoofEstimator::new(gray.view(), None, world_to_raster, projection, shade, roof_config)?;
        if let Some(observer) = &self.observer {
            roof_estimator = roof_estimator.with_observer(Arc::clone(observer));
        }
        let search = roof_estimator.locate(
            &feature.footprint,
            -tile_top_left,
            self.config.roof_variants,
            None,
        )?;
        if search.responses.is_empty() {
            trace_event!("feature_without_roof", id = feature.id);
            return Ok(None);
        }

        let model = ModelKind::new(self.config.variant, feature.footprint.clone(), projection, shade);
        let mut estimator = StructureEstimator::new(
            &model,
            &search.responses,
            gray.view(),
            tile_top_left,
            world_to_raster,
            self.scoring_params(),
        );
        if let Some(observer) = &self.observer {
            estimator = estimator.with_observer(Arc::clone(observer));
        }
        let groups = estimator.estimate(
            max_length,
            self.config.projection_step,
            self.config.roof_variants,
            self.config.shade_variants,
        );

        let Some(choice) = choose_single_view(&groups) else {
            return Ok(None);
        };
        let world = choice.structure.to_world(&raster_to_world, tile_top_left);
        Ok(Some(FeatureReconstruction {
            id: feature.id,
            length: choice.length,
            value: choice.value,
            shade_weight: choice.estimates.shade_weight,
            roof: world.roof().clone(),
            projection: world.projection().clone(),
            shade: world.shade().clone(),
        }))
    }

    /// Reconstructs every feature; failures are logged and skipped.
    ///
    /// Results are sorted by feature id.
    pub fn reconstruct_all<R: RasterSource + Sync + ?Sized>(
        &self,
        raster: &R,
        features: &[BuildingFeature],
    ) -> Vec<FeatureReconstruction> {
        let _span = trace_span!("reconstruct_all", features = features.len()).entered();
        let run = |feature: &BuildingFeature| match self.reconstruct_feature(raster, feature) {
            Ok(result) => result,
            Err(err) => {
                trace_warn!(
                    "feature_skipped",
                    id = feature.id,
                    reason = err.to_string().as_str()
                );
                None
            }
        };

        #[cfg(feature = "rayon")]
        let mut results: Vec<FeatureReconstruction> = if self.config.parallel {
            features.par_iter().filter_map(run).collect()
        } else {
            features.iter().filter_map(run).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let mut results: Vec<FeatureReconstruction> = features.iter().filter_map(run).collect();

        results.sort_by_key(|r| r.id);
        trace_event!("reconstructed", kept = results.len());
        results
    }

    /// Reconstructs one feature seen in several views.
    ///
    /// The footprint is held at its nominal position in every view; lengths
    /// are ranked by consensus and the result is expressed in the world frame
    /// of the first view that has a footprint.
    pub fn reconstruct_multiview(
        &self,
        id: u64,
        views: &[ViewSource<'_>],
    ) -> RoofShadeResult<Option<FeatureReconstruction>> {
        let _span = trace_span!("reconstruct_multiview", id = id, views = views.len()).entered();
        let Some(primary) = views.iter().position(|v| v.footprint.is_some()) else {
            return Ok(None);
        };

        let mut geometries = Vec::with_capacity(views.len());
        for view in views {
            geometries.push(ViewGeometry {
                footprint: view.footprint.clone(),
                projection: view.projection,
                shade: view.shade,
                world_to_raster: invert(&view.raster.raster_to_world())?,
            });
        }
        let norm = max_abs_component(
            geometries
                .iter()
                .flat_map(|g| {
                    [
                        apply_linear(&g.world_to_raster, g.projection),
                        apply_linear(&g.world_to_raster, g.shade),
                    ]
                })
                .collect::<Vec<_>>()
                .iter(),
        );
        let norm = if norm > 0.0 { norm } else { 1.0 };

        let max_length = self.config.max_length.max(1);
        let mut shifts = Vec::with_capacity(views.len());
        let mut tiles = Vec::with_capacity(views.len());
        let mut origins = Vec::with_capacity(views.len());
        for (view, geometry) in views.iter().zip(&geometries) {
            let Some(footprint) = &geometry.footprint else {
                shifts.push(Point::zeros());
                tiles.push(Tile::empty());
                origins.push(Point::zeros());
                continue;
            };
            let window = self.tile_window(
                view.raster,
                &geometry.world_to_raster,
                footprint,
                geometry.projection / norm,
                geometry.shade / norm,
                max_length,
            );
            let (tile, origin) = match window {
                Ok((x, y, w, h)) => (view.raster.read_window(x, y, w, h)?, Point::new(x as f64, y as f64)),
                Err(err) => {
                    trace_warn!("view_outside_raster", reason = err.to_string().as_str());
                    (Tile::empty(), Point::zeros())
                }
            };
            shifts.push(-origin);
            tiles.push(tile);
            origins.push(origin);
        }

        let model = MultiviewModel::new(
            &geometries,
            1,
            max_length,
            self.config.variant,
            self.scoring_params(),
        )?;
        let mut estimator = MultiviewEstimator::new(model).with_policy(self.config.baseline);
        if let Some(observer) = &self.observer {
            estimator = estimator.with_observer(Arc::clone(observer));
        }
        let ranked = estimator.rank(&shifts, &tiles, self.config.shade_variants)?;

        let linear_size = geometries[primary]
            .footprint
            .as_ref()
            .map_or(1.0, |f| f.area().sqrt());
        let Some(chosen) = ranked.get(choose_multiview(&ranked, linear_size, max_length)) else {
            return Ok(None);
        };
        let Some(Some(structure)) = chosen.structures.get(primary) else {
            return Ok(None);
        };
        let world = structure.to_world(&views[primary].raster.raster_to_world(), origins[primary]);
        Ok(Some(FeatureReconstruction {
            id,
            length: chosen.length,
            value: chosen.response,
            shade_weight: chosen.shade_weight.unwrap_or(0.0),
            roof: world.roof().clone(),
            projection: world.projection().clone(),
            shade: world.shade().clone(),
        }))
    }

    /// Raster window covering every placement the search can visit.
    ///
    /// `projection` and `shade` are world directions already scaled so that
    /// one length unit moves at most one pixel.
    fn tile_window<R: RasterSource + ?Sized>(
        &self,
        raster: &R,
        world_to_raster: &Matrix3<f64>,
        footprint: &Polygon,
        projection: Point,
        shade: Point,
        max_length: u32,
    ) -> RoofShadeResult<Window> {
        let bbox = footprint.transformed(world_to_raster).bbox();
        if bbox.is_empty() {
            return Err(RoofShadeError::DegenerateFootprint {
                reason: "footprint has no vertices",
            });
        }
        let len = max_length as f64;
        let p = apply_linear(world_to_raster, projection) * len;
        let s = apply_linear(world_to_raster, shade) * len;
        let reach = [Point::zeros(), p, -p, s - p, s]
            .iter()
            .fold(BBox::empty(), |acc, d| {
                acc.union(&BBox::from_points([bbox.min + d, bbox.max + d]))
            });

        let block = linear_block(world_to_raster);
        let w = self.config.position_walk;
        let walk = max_abs_component(
            [Point::new(w, w), Point::new(w, -w)]
                .iter()
                .map(|c| block * c)
                .collect::<Vec<_>>()
                .iter(),
        );
        let reach = reach.expanded(walk + self.config.tile_margin as f64);

        let x0 = reach.min.x.floor().max(0.0);
        let y0 = reach.min.y.floor().max(0.0);
        let x1 = reach.max.x.ceil().min(raster.width() as f64);
        let y1 = reach.max.y.ceil().min(raster.height() as f64);
        if x1 <= x0 || y1 <= y0 {
            return Err(RoofShadeError::RoiOutOfBounds {
                x: x0 as usize,
                y: y0 as usize,
                width: 0,
                height: 0,
                img_width: raster.width(),
                img_height: raster.height(),
            });
        }
        Ok((
            x0 as usize,
            y0 as usize,
            (x1 - x0) as usize,
            (y1 - y0) as usize,
        ))
    }
}
