//! Roof position search on a single tile.
//!
//! The tile is converted once into an 8-bit edge image using a
//! first-derivative kernel across the shade direction. Candidate roof
//! placements are integer pixel shifts inside a search region: a square of
//! `position_walk` world units around the nominal position, swept along the
//! projection direction by `max_length` (a tall building's roof is displaced
//! along the projection). Each shift is scored by sampling the edge image
//! along the shifted footprint boundary, and the response surface is reduced
//! with windowed non-maximum suppression.

use crate::candidate::nms::local_maxima;
use crate::candidate::peak::Peak;
use crate::geometry::sweep::sweep_solid;
use crate::geometry::transform::{apply_linear, invert, linear_block, translation};
use crate::geometry::{MultiPolygon, Point, Polygon, Ring};
use crate::image::{ImageView, OwnedImage};
use crate::kernel::render::render_segments;
use crate::kernel::{FirstDirectedDerivative, SparseKernel, DEFAULT_ZERO_THRESHOLD};
use crate::model::normalize_pair;
use crate::search::observer::{EstimationObserver, RoofCandidateEvent};
use crate::trace::{trace_event, trace_span};
use crate::util::math::to_polar;
use crate::util::{RoofShadeError, RoofShadeResult};
use nalgebra::{Matrix2, Matrix3};
use std::sync::Arc;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Configuration for [`RoofEstimator`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoofSearchConfig {
    /// Half-size of the search square in world units.
    pub position_walk: f64,
    /// Largest extrusion length considered, in units of the projection step.
    pub max_length: f64,
    /// Half-width of the non-maximum suppression window.
    pub nms_half_width: usize,
    /// Sigma of the edge kernel.
    pub edge_sigma: f64,
    /// Half-size of the rectangular edge kernel.
    pub edge_half_size: usize,
    /// Sigma of the blur used to render evidence segments.
    pub segment_sigma: f64,
    /// Half-size of the segment blur kernel.
    pub segment_half_size: usize,
}

impl Default for RoofSearchConfig {
    fn default() -> Self {
        Self {
            position_walk: 15.0,
            max_length: 70.0,
            nms_half_width: 3,
            edge_sigma: 3.0,
            edge_half_size: 9,
            segment_sigma: 2.0,
            segment_half_size: 6,
        }
    }
}

/// A ranked roof placement.
#[derive(Clone, Debug, PartialEq)]
pub struct RoofResponse {
    /// Integer pixel shift from the nominal footprint position.
    pub shift: Point,
    /// Footprint moved by the shift, in world coordinates.
    pub footprint_world: Polygon,
    /// Footprint moved by the shift, in tile pixels.
    pub footprint_tile: Polygon,
    /// Heatmap response at the shift.
    pub value: f64,
    /// Shift length relative to the search radius.
    pub deviation: f64,
}

/// Result of [`RoofEstimator::locate`].
#[derive(Clone, Debug, PartialEq)]
pub struct RoofSearch {
    /// Candidates sorted by descending response.
    pub responses: Vec<RoofResponse>,
    /// Non-maximum survivors rescaled to 8 bits, indexed by tile position of
    /// the footprint's first vertex.
    pub heatmap: OwnedImage<u8>,
}

/// Locates roof placements on one tile.
pub struct RoofEstimator {
    edges: OwnedImage<u8>,
    world_to_raster: Matrix3<f64>,
    raster_to_world: Matrix2<f64>,
    projection_pixel: Point,
    search_region: MultiPolygon,
    config: RoofSearchConfig,
    observer: Option<Arc<dyn EstimationObserver>>,
}

impl RoofEstimator {
    /// Prepares the edge image and the default search region.
    ///
    /// `mask`, when given, restricts edge computation to non-zero pixels.
    pub fn new(
        tile_gray: ImageView<'_, u8>,
        mask: Option<ImageView<'_, u8>>,
        world_to_raster: Matrix3<f64>,
        projection_world: Point,
        shade_world: Point,
        config: RoofSearchConfig,
    ) -> RoofShadeResult<Self> {
        let raster_to_world = linear_block(&invert(&world_to_raster)?);
        let projection_pixel = apply_linear(&world_to_raster, projection_world);
        let shade_pixel = apply_linear(&world_to_raster, shade_world);

        let kernel = SparseKernel::rectangular(
            &FirstDirectedDerivative::new(to_polar(shade_pixel).1, config.edge_sigma, 0.5),
            config.edge_half_size,
            config.edge_half_size,
            DEFAULT_ZERO_THRESHOLD,
        );
        #[cfg(feature = "rayon")]
        let response = crate::kernel::rayon::convolve_par(&kernel, tile_gray, mask)?;
        #[cfg(not(feature = "rayon"))]
        let response = kernel.convolve(tile_gray, mask)?;
        let edges = response.normalize_to_u8();

        let (projection_pixel, _) = normalize_pair(projection_pixel, shade_pixel);
        let search_region = build_search_region(
            &linear_block(&world_to_raster),
            config.position_walk,
            projection_pixel,
            config.max_length,
        )?;

        Ok(Self {
            edges,
            world_to_raster,
            raster_to_world,
            projection_pixel,
            search_region,
            config,
            observer: None,
        })
    }

    /// Attaches an observer notified for every evaluated shift.
    pub fn with_observer(mut self, observer: Arc<dyn EstimationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// 8-bit edge response of the tile.
    pub fn edges(&self) -> &OwnedImage<u8> {
        &self.edges
    }

    /// Search region in pixel shifts around the nominal position.
    pub fn search_region(&self) -> &MultiPolygon {
        &self.search_region
    }

    /// Finds up to `variants` roof placements for `footprint_world`.
    ///
    /// `tile_offset` maps raster pixels to tile pixels (usually minus the
    /// tile's top-left corner). `segments`, when given, are evidence outlines
    /// in tile pixels that are added to the edge response.
    pub fn locate(
        &self,
        footprint_world: &Polygon,
        tile_offset: Point,
        variants: usize,
        segments: Option<&[MultiPolygon]>,
    ) -> RoofShadeResult<RoofSearch> {
        let _span = trace_span!("roof_locate", variants = variants).entered();
        let world_to_tile = translation(tile_offset) * self.world_to_raster;
        let footprint_tile = footprint_world.transformed(&world_to_tile);
        let boundary: Vec<(i64, i64)> = MultiPolygon::from(footprint_tile.clone())
            .segmentize(1.0)
            .iter()
            .map(|p| (p.x.floor() as i64, p.y.floor() as i64))
            .collect();
        let walk = footprint_world.area().sqrt();
        let Some(first) = footprint_tile.exterior().points().first().copied() else {
            return Err(RoofShadeError::DegenerateFootprint {
                reason: "footprint has no vertices",
            });
        };
        if boundary.is_empty() || walk.is_nan() || walk <= 0.0 {
            return Err(RoofShadeError::DegenerateFootprint {
                reason: "footprint has no area",
            });
        }

        let region = if walk < self.config.position_walk {
            build_search_region(
                &linear_block(&self.world_to_raster),
                walk,
                self.projection_pixel,
                self.config.max_length,
            )?
        } else {
            self.search_region.clone()
        };

        let (width, height) = (self.edges.width(), self.edges.height());
        let start = (first.x.floor() as i64, first.y.floor() as i64);
        let segment_maps = match segments.filter(|s| !s.is_empty()) {
            Some(segs) => Some(render_segments(
                segs,
                self.config.segment_sigma,
                self.config.segment_half_size,
                width,
                height,
            )?),
            None => None,
        };

        let bbox = region.bbox();
        let mut shifts: Vec<(i64, i64)> = Vec::new();
        if !bbox.is_empty() {
            for sy in bbox.min.y.ceil() as i64..=bbox.max.y.floor() as i64 {
                for sx in bbox.min.x.ceil() as i64..=bbox.max.x.floor() as i64 {
                    let (hx, hy) = (start.0 + sx, start.1 + sy);
                    if hx < 0 || hy < 0 || hx >= width as i64 || hy >= height as i64 {
                        continue;
                    }
                    if region.contains(Point::new(sx as f64, sy as f64)) {
                        shifts.push((sx, sy));
                    }
                }
            }
        }

        let evaluate = |&(sx, sy): &(i64, i64)| -> f64 {
            let response = match &segment_maps {
                Some(maps) => {
                    let segment_best = maps
                        .iter()
                        .map(|m| boundary_sum(m.view(), &boundary, sx, sy).0)
                        .fold(0.0f64, f64::max);
                    segment_best + boundary_sum(self.edges.view(), &boundary, sx, sy).0
                }
                None => {
                    let (sum, nonzero) = boundary_sum(self.edges.view(), &boundary, sx, sy);
                    sum * nonzero as f64
                }
            };
            if let Some(observer) = &self.observer {
                observer.on_roof_candidate(&RoofCandidateEvent {
                    shift: Point::new(sx as f64, sy as f64),
                    response,
                });
            }
            response
        };
        #[cfg(feature = "rayon")]
        let values: Vec<f64> = shifts.par_iter().map(evaluate).collect();
        #[cfg(not(feature = "rayon"))]
        let values: Vec<f64> = shifts.iter().map(evaluate).collect();

        let mut surface = OwnedImage::<f64>::zeros(width, height)?;
        for (&(sx, sy), &value) in shifts.iter().zip(values.iter()) {
            if let Some(cell) = surface.get_mut((start.0 + sx) as usize, (start.1 + sy) as usize) {
                *cell = value;
            }
        }

        let peaks = local_maxima(surface.view(), self.config.nms_half_width);
        trace_event!(
            "roof_candidates",
            evaluated = shifts.len(),
            maxima = peaks.len()
        );
        let heatmap = peaks_heatmap(&peaks, width, height)?;

        let responses = peaks
            .iter()
            .take(variants)
            .map(|peak| {
                let shift = Point::new(
                    (peak.x as i64 - start.0) as f64,
                    (peak.y as i64 - start.1) as f64,
                );
                let shift_world = self.raster_to_world * shift;
                RoofResponse {
                    shift,
                    footprint_world: footprint_world.translated(shift_world),
                    footprint_tile: footprint_tile.translated(shift),
                    value: peak.score,
                    deviation: shift.norm() / walk,
                }
            })
            .collect();

        Ok(RoofSearch { responses, heatmap })
    }
}

/// Sums `image` over boundary samples moved by `(sx, sy)`, clamping to the
/// image border; also returns how many samples were non-zero.
fn boundary_sum(image: ImageView<'_, u8>, boundary: &[(i64, i64)], sx: i64, sy: i64) -> (f64, usize) {
    let mut sum = 0u64;
    let mut nonzero = 0usize;
    for &(x, y) in boundary {
        let v = image.get_clamped(x + sx, y + sy);
        if v != 0 {
            sum += v as u64;
            nonzero += 1;
        }
    }
    (sum as f64, nonzero)
}

fn peaks_heatmap(
    peaks: &[Peak],
    width: usize,
    height: usize,
) -> RoofShadeResult<OwnedImage<u8>> {
    let mut heatmap = OwnedImage::<u8>::zeros(width, height)?;
    let max = peaks.iter().map(|p| p.score).fold(0.0f64, f64::max);
    if max <= 0.0 {
        return Ok(heatmap);
    }
    for peak in peaks {
        if let Some(cell) = heatmap.get_mut(peak.x, peak.y) {
            *cell = (peak.score / max * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }
    Ok(heatmap)
}

/// Square of half-size `walk` (world units) mapped to pixels, swept along
/// the jointly normalized `direction` by `max_length`.
fn build_search_region(
    block: &Matrix2<f64>,
    walk: f64,
    direction: Point,
    max_length: f64,
) -> RoofShadeResult<MultiPolygon> {
    let corners = [
        Point::new(-walk, -walk),
        Point::new(walk, -walk),
        Point::new(walk, walk),
        Point::new(-walk, walk),
    ];
    let square = Polygon::new(Ring::new(corners.iter().map(|c| block * c).collect()), Vec::new());
    sweep_solid(&square, direction, max_length)
}
