//! Length sweep over roof candidates.

use crate::geometry::transform::apply_linear;
use crate::geometry::{MultiPolygon, Point};
use crate::image::{ImageView, OwnedImage};
use crate::kernel::render::render_segments;
use crate::model::{normalize_pair, BuildingModel, Estimates, ScoringKernels, ScoringParams, Structure};
use crate::search::observer::{EstimationObserver, StructureEvent};
use crate::search::roof::RoofResponse;
use crate::trace::{trace_event, trace_span};
use crate::util::RoofShadeResult;
use nalgebra::Matrix3;
use std::sync::Arc;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Blur used when rendering evidence segments for wall scoring.
const SEGMENT_SIGMA: f64 = 3.0;
const SEGMENT_HALF_SIZE: usize = 12;

/// One scored structure.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelResponse {
    pub length: u32,
    /// `projection * shade * roof confidence`.
    pub value: f64,
    pub estimates: Estimates,
    /// Structure placed on the roof candidate, in tile pixels.
    pub structure: Structure,
}

/// Scored lengths for one roof candidate.
///
/// `responses[0]` is the length-1 baseline; the rest are sorted by
/// descending value.
#[derive(Clone, Debug, PartialEq)]
pub struct StructureCandidates {
    pub roof: RoofResponse,
    /// Best value over every evaluated length.
    pub value: f64,
    pub responses: Vec<ModelResponse>,
}

/// Sweeps extrusion length for the top roof candidates of one tile.
pub struct StructureEstimator<'a, M: BuildingModel> {
    model: &'a M,
    roofs: &'a [RoofResponse],
    tile: ImageView<'a, u8>,
    tile_top_left: Point,
    world_to_raster: Matrix3<f64>,
    params: ScoringParams,
    evidence: Vec<OwnedImage<u8>>,
    observer: Option<Arc<dyn EstimationObserver>>,
}

impl<'a, M: BuildingModel> StructureEstimator<'a, M> {
    /// `model` is in world coordinates; `tile_top_left` is the tile origin in
    /// raster pixels.
    pub fn new(
        model: &'a M,
        roofs: &'a [RoofResponse],
        tile: ImageView<'a, u8>,
        tile_top_left: Point,
        world_to_raster: Matrix3<f64>,
        params: ScoringParams,
    ) -> Self {
        Self {
            model,
            roofs,
            tile,
            tile_top_left,
            world_to_raster,
            params,
            evidence: Vec::new(),
            observer: None,
        }
    }

    /// Uses evidence outlines (tile pixels) instead of the wall-edge kernel.
    pub fn with_segments(mut self, segments: &[MultiPolygon]) -> RoofShadeResult<Self> {
        self.evidence = render_segments(
            segments,
            SEGMENT_SIGMA,
            SEGMENT_HALF_SIZE,
            self.tile.width(),
            self.tile.height(),
        )?;
        Ok(self)
    }

    pub fn with_observer(mut self, observer: Arc<dyn EstimationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    fn evaluate_length(
        &self,
        length: u32,
        roof_max: usize,
        kernels: &ScoringKernels,
    ) -> Vec<(usize, ModelResponse)> {
        let structure = self.model.generate(length);
        let evidence = (!self.evidence.is_empty()).then_some(self.evidence.as_slice());
        self.roofs
            .iter()
            .take(roof_max)
            .enumerate()
            .map(|(roof_index, roof)| {
                let local = structure.to_raster(&self.world_to_raster, roof.shift - self.tile_top_left);
                let estimates = local.estimate_with(self.tile, kernels, &self.params, evidence);
                let value = estimates.product() * roof.value;
                if let Some(observer) = &self.observer {
                    observer.on_structure_evaluated(&StructureEvent {
                        roof_index,
                        length,
                        estimates,
                        value,
                    });
                }
                (
                    roof_index,
                    ModelResponse {
                        length,
                        value,
                        estimates,
                        structure: local,
                    },
                )
            })
            .collect()
    }

    /// Scores lengths `1, 1 + step, ...` up to `max_length` for the first
    /// `roof_max` roof candidates.
    ///
    /// Each group keeps the length-1 baseline first and at most `shade_max`
    /// entries; groups are sorted by their best value.
    pub fn estimate(
        &self,
        max_length: u32,
        projection_step: u32,
        roof_max: usize,
        shade_max: usize,
    ) -> Vec<StructureCandidates> {
        let _span = trace_span!("structure_estimate", max_length = max_length).entered();
        let (projection_pixel, shade_pixel) = normalize_pair(
            apply_linear(&self.world_to_raster, self.model.projection_step()),
            apply_linear(&self.world_to_raster, self.model.shade_step()),
        );
        let kernels = ScoringKernels::new(projection_pixel, shade_pixel, &self.params);
        let lengths: Vec<u32> = (1..=max_length.max(1))
            .step_by(projection_step.max(1) as usize)
            .collect();

        #[cfg(feature = "rayon")]
        let per_length: Vec<Vec<(usize, ModelResponse)>> = lengths
            .par_iter()
            .map(|&length| self.evaluate_length(length, roof_max, &kernels))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let per_length: Vec<Vec<(usize, ModelResponse)>> = lengths
            .iter()
            .map(|&length| self.evaluate_length(length, roof_max, &kernels))
            .collect();

        let group_count = roof_max.min(self.roofs.len());
        let mut groups: Vec<Vec<ModelResponse>> = vec![Vec::new(); group_count];
        for (roof_index, response) in per_length.into_iter().flatten() {
            groups[roof_index].push(response);
        }

        let mut candidates: Vec<StructureCandidates> = groups
            .into_iter()
            .zip(self.roofs.iter())
            .map(|(mut responses, roof)| {
                let value = responses
                    .iter()
                    .map(|r| r.value)
                    .fold(f64::NEG_INFINITY, f64::max);
                if responses.len() > 1 {
                    responses[1..].sort_by(|a, b| {
                        b.value.total_cmp(&a.value).then_with(|| a.length.cmp(&b.length))
                    });
                }
                responses.truncate(shade_max);
                StructureCandidates {
                    roof: roof.clone(),
                    value,
                    responses,
                }
            })
            .collect();
        candidates.sort_by(|a, b| b.value.total_cmp(&a.value));
        trace_event!("structure_groups", groups = candidates.len());
        candidates
    }
}
