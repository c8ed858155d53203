//! Consensus ranking over several views of one footprint.
//!
//! Each view brings its own footprint in its raster frame, its own direction
//! vectors and its own world-to-raster transform. Pixel directions of all
//! views are divided by one common factor (the largest component over every
//! view) so that a length means the same physical height everywhere. Every
//! view precomputes its structures over the shared length range; ranking
//! then only translates and scores cached polygons.

use crate::geometry::transform::apply_linear;
use crate::geometry::{Point, Polygon};
use crate::image::{OwnedImage, Tile};
use crate::model::{ModelKind, ModelVariant, Precalculated, ScoringKernels, ScoringParams, Structure};
use crate::search::observer::{ConsensusEvent, EstimationObserver};
use crate::trace::{trace_event, trace_span};
use crate::util::math::max_abs_component;
use crate::util::{RoofShadeError, RoofShadeResult};
use nalgebra::Matrix3;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Length treated as the no-extrusion baseline.
pub const BASELINE_LENGTH: u32 = 1;

/// Observation of the footprint in one view.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewGeometry {
    /// Footprint in world coordinates; `None` when the view lacks it.
    pub footprint: Option<Polygon>,
    /// Projection direction in world units.
    pub projection: Point,
    /// Shade direction in world units.
    pub shade: Point,
    pub world_to_raster: Matrix3<f64>,
}

/// Where the baseline length lands in a ranking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BaselinePolicy {
    /// The baseline is ranked first whatever its score, and reports the
    /// score it actually obtained.
    #[default]
    ForcedPriority,
    /// The baseline is ranked by its score like any other length.
    Computed,
}

/// Combined score of one length across views.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Consensus {
    /// Sum of `projection * shade * shade_weight` over contributing views.
    pub score: f64,
    /// Mean shade weight over contributing views.
    pub shade_weight: Option<f64>,
    /// Number of views with both a model and tile data.
    pub contributing: usize,
}

/// One ranked length.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiviewResponse {
    pub length: u32,
    pub response: f64,
    pub shade_weight: Option<f64>,
    /// Per-view structure at this length, shifted onto its tile.
    pub structures: Vec<Option<Structure>>,
}

struct ViewModel {
    cache: Precalculated,
    kernels: ScoringKernels,
}

/// Per-view structure caches over a shared length range.
pub struct MultiviewModel {
    views: Vec<Option<ViewModel>>,
    from: u32,
    to: u32,
    params: ScoringParams,
}

impl MultiviewModel {
    /// Builds one cache per view over `[from, to]`.
    pub fn new(
        views: &[ViewGeometry],
        from: u32,
        to: u32,
        variant: ModelVariant,
        params: ScoringParams,
    ) -> RoofShadeResult<Self> {
        if from == 0 || from > to {
            return Err(RoofShadeError::InvalidRange { from, to });
        }
        let pixel: Vec<(Point, Point)> = views
            .iter()
            .map(|v| {
                (
                    apply_linear(&v.world_to_raster, v.projection),
                    apply_linear(&v.world_to_raster, v.shade),
                )
            })
            .collect();
        let norm = max_abs_component(pixel.iter().flat_map(|(p, s)| [p, s]));
        let norm = if norm > 0.0 { norm } else { 1.0 };

        let views = views
            .iter()
            .zip(pixel)
            .map(|(view, (projection, shade))| {
                let Some(footprint) = &view.footprint else {
                    return Ok(None);
                };
                let (projection, shade) = (projection / norm, shade / norm);
                let model = ModelKind::new(
                    variant,
                    footprint.transformed(&view.world_to_raster),
                    projection,
                    shade,
                );
                Ok(Some(ViewModel {
                    cache: Precalculated::build(&model, from, to)?,
                    kernels: ScoringKernels::new(projection, shade, &params),
                }))
            })
            .collect::<RoofShadeResult<Vec<_>>>()?;

        Ok(Self {
            views,
            from,
            to,
            params,
        })
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn range(&self) -> RangeInclusive<u32> {
        self.from..=self.to
    }

    /// Cached structure of `view` at `length`, in raster pixels.
    pub fn structure(&self, view: usize, length: u32) -> Option<&Structure> {
        self.views.get(view)?.as_ref()?.cache.get(length)
    }

    fn check_len(&self, got: usize) -> RoofShadeResult<()> {
        if got != self.views.len() {
            return Err(RoofShadeError::ViewCountMismatch {
                expected: self.views.len(),
                got,
            });
        }
        Ok(())
    }

    /// Scores `length` on every view with data and combines the results.
    ///
    /// `shifts` map raster pixels to tile pixels per view.
    pub fn consensus(&self, length: u32, shifts: &[Point], tiles: &[Tile]) -> RoofShadeResult<Consensus> {
        self.check_len(shifts.len())?;
        self.check_len(tiles.len())?;
        let grays = gray_tiles(tiles)?;
        Ok(self.consensus_gray(length, shifts, &grays))
    }

    fn consensus_gray(&self, length: u32, shifts: &[Point], grays: &[Option<OwnedImage<u8>>]) -> Consensus {
        let mut score = 0.0;
        let mut weight_sum = 0.0;
        let mut contributing = 0usize;
        for ((view, shift), gray) in self.views.iter().zip(shifts).zip(grays) {
            let (Some(view), Some(gray)) = (view, gray) else {
                continue;
            };
            let e = view
                .cache
                .estimate(length, *shift, gray.view(), &view.kernels, &self.params, None);
            score += e.product() * e.shade_weight;
            weight_sum += e.shade_weight;
            contributing += 1;
        }
        Consensus {
            score,
            shade_weight: (contributing > 0).then(|| weight_sum / contributing as f64),
            contributing,
        }
    }
}

fn gray_tiles(tiles: &[Tile]) -> RoofShadeResult<Vec<Option<OwnedImage<u8>>>> {
    tiles
        .iter()
        .map(|t| if t.is_empty() { Ok(None) } else { t.to_gray().map(Some) })
        .collect()
}

/// Ranks lengths by multiview consensus.
pub struct MultiviewEstimator {
    model: MultiviewModel,
    policy: BaselinePolicy,
    observer: Option<Arc<dyn EstimationObserver>>,
}

impl MultiviewEstimator {
    pub fn new(model: MultiviewModel) -> Self {
        Self {
            model,
            policy: BaselinePolicy::default(),
            observer: None,
        }
    }

    pub fn with_policy(mut self, policy: BaselinePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn EstimationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn model(&self) -> &MultiviewModel {
        &self.model
    }

    pub fn policy(&self) -> BaselinePolicy {
        self.policy
    }

    /// Scores every length in the model's range and returns the best
    /// `responses_max`, ordered according to the baseline policy.
    pub fn rank(
        &self,
        shifts: &[Point],
        tiles: &[Tile],
        responses_max: usize,
    ) -> RoofShadeResult<Vec<MultiviewResponse>> {
        let _span = trace_span!("multiview_rank", views = self.model.view_count()).entered();
        self.model.check_len(shifts.len())?;
        self.model.check_len(tiles.len())?;
        let grays = gray_tiles(tiles)?;

        let mut entries: Vec<MultiviewResponse> = self
            .model
            .range()
            .map(|length| {
                let c = self.model.consensus_gray(length, shifts, &grays);
                if let Some(observer) = &self.observer {
                    observer.on_consensus(&ConsensusEvent {
                        length,
                        score: c.score,
                        shade_weight: c.shade_weight,
                        contributing: c.contributing,
                    });
                }
                MultiviewResponse {
                    length,
                    response: c.score,
                    shade_weight: c.shade_weight,
                    structures: (0..self.model.view_count())
                        .map(|v| {
                            self.model
                                .structure(v, length)
                                .map(|s| s.translated(shifts[v]))
                        })
                        .collect(),
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            b.response
                .total_cmp(&a.response)
                .then_with(|| a.length.cmp(&b.length))
        });
        if self.policy == BaselinePolicy::ForcedPriority {
            if let Some(pos) = entries.iter().position(|e| e.length == BASELINE_LENGTH) {
                let baseline = entries.remove(pos);
                entries.insert(0, baseline);
            }
        }
        entries.truncate(responses_max);
        trace_event!("multiview_ranked", kept = entries.len());
        Ok(entries)
    }
}
