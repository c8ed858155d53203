//! Photometric scoring of a structure against a gray tile.
//!
//! Walls are expected to show a step edge across the projection direction
//! and shade borders a step across the shade direction (or along either
//! side of it). Both are measured with line-shaped first-derivative kernels
//! sampled on the segmentized polygon boundaries. The shade score is further
//! weighted by how dark the tile is inside the shade polygons.

use crate::geometry::raster::for_each_pixel_inside;
use crate::geometry::Point;
use crate::image::{ImageView, OwnedImage};
use crate::kernel::{FirstDirectedDerivative, SparseKernel, DEFAULT_ZERO_THRESHOLD};
use crate::model::Structure;
use crate::util::math::{shade_weight, to_polar};
use std::f64::consts::{FRAC_PI_2, PI};

/// Tunables for [`Structure::estimate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoringParams {
    /// Spacing of boundary samples in pixels.
    pub segmentize_step: f64,
    /// Derivative sigma for wall edges.
    pub projection_sigma: f64,
    /// Derivative sigma for shade edges.
    pub shade_sigma: f64,
    /// Perpendicular cut-off of the derivative kernels.
    pub span: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            segmentize_step: 1.0,
            projection_sigma: 3.0,
            shade_sigma: 3.0,
            span: 0.5,
        }
    }
}

/// Kernels for one pair of pixel-space directions.
///
/// Building them once per direction pair lets a length sweep reuse them.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoringKernels {
    projection: SparseKernel,
    shade: [SparseKernel; 3],
}

impl ScoringKernels {
    pub fn new(projection_step: Point, shade_step: Point, params: &ScoringParams) -> Self {
        let projection_angle = to_polar(projection_step).1 + PI;
        let shade_angle = to_polar(shade_step).1 + PI;
        let edge = |angle: f64, sigma: f64| {
            let half = (sigma * 3.0).round().max(1.0) as usize;
            SparseKernel::rectangular(
                &FirstDirectedDerivative::new(angle, sigma, params.span),
                half,
                half,
                DEFAULT_ZERO_THRESHOLD,
            )
        };
        Self {
            projection: edge(projection_angle, params.projection_sigma),
            shade: [
                edge(shade_angle, params.shade_sigma),
                edge(shade_angle + FRAC_PI_2, params.shade_sigma),
                edge(shade_angle - FRAC_PI_2, params.shade_sigma),
            ],
        }
    }

    pub fn projection(&self) -> &SparseKernel {
        &self.projection
    }

    pub fn shade(&self) -> &[SparseKernel; 3] {
        &self.shade
    }
}

/// Scores of one structure.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Estimates {
    /// Mean wall-edge response per boundary sample.
    pub projection: f64,
    /// Mean shade-edge response per boundary sample, times `shade_weight`.
    pub shade: f64,
    /// Darkness weight of the shade area in `[0, 1]`.
    pub shade_weight: f64,
}

impl Estimates {
    /// `projection * shade`.
    pub fn product(&self) -> f64 {
        self.projection * self.shade
    }
}

#[inline]
fn sample_at(p: Point) -> (i64, i64) {
    (p.x.floor() as i64, p.y.floor() as i64)
}

fn ratio(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

impl Structure {
    /// Scores the structure against `tile`, building kernels on the fly.
    ///
    /// The structure must already be in the tile's pixel frame. `evidence`
    /// holds optional per-segment masks aligned with the tile; when present
    /// they replace the wall-edge kernel.
    pub fn estimate(
        &self,
        tile: ImageView<'_, u8>,
        params: &ScoringParams,
        evidence: Option<&[OwnedImage<u8>]>,
    ) -> Estimates {
        let kernels = ScoringKernels::new(self.projection_step(), self.shade_step(), params);
        self.estimate_with(tile, &kernels, params, evidence)
    }

    /// Scores the structure with prebuilt kernels.
    pub fn estimate_with(
        &self,
        tile: ImageView<'_, u8>,
        kernels: &ScoringKernels,
        params: &ScoringParams,
        evidence: Option<&[OwnedImage<u8>]>,
    ) -> Estimates {
        let evidence = evidence.filter(|maps| !maps.is_empty());

        let projection_points = self.projection().segmentize(params.segmentize_step);
        let projection_sum: f64 = projection_points
            .iter()
            .map(|&p| {
                let (x, y) = sample_at(p);
                match evidence {
                    Some(maps) => maps
                        .iter()
                        .map(|m| m.view().get_clamped(x, y))
                        .max()
                        .unwrap_or(0) as f64,
                    None => kernels.projection.apply(tile, x, y).max(0) as f64,
                }
            })
            .sum();

        let shade_points = self.shade().segmentize(params.segmentize_step);
        let shade_sum: f64 = shade_points
            .iter()
            .map(|&p| {
                let (x, y) = sample_at(p);
                let best = kernels
                    .shade
                    .iter()
                    .map(|k| k.apply(tile, x, y))
                    .max()
                    .unwrap_or(0);
                best.max(0) as f64
            })
            .sum();

        let weight = shade_weight(self.shade_brightness(tile));
        Estimates {
            projection: ratio(projection_sum, projection_points.len()),
            shade: ratio(shade_sum * weight, shade_points.len()),
            shade_weight: weight,
        }
    }

    /// Mean tile value inside the shade polygons, in `[0, 1]`.
    ///
    /// Returns 1 (fully bright, implausible shade) when no pixel is covered.
    pub fn shade_brightness(&self, tile: ImageView<'_, u8>) -> f64 {
        let mut sum = 0u64;
        let mut count = 0u64;
        for_each_pixel_inside(self.shade(), tile.width(), tile.height(), |x, y| {
            if let Some(v) = tile.get(x, y) {
                sum += v as u64;
                count += 1;
            }
        });
        if count == 0 {
            1.0
        } else {
            sum as f64 / count as f64 / 255.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{MultiPolygon, Polygon};

    fn square_structure() -> Structure {
        Structure::new(
            5,
            MultiPolygon::from(Polygon::rect(20.0, 20.0, 40.0, 40.0)),
            MultiPolygon::from(Polygon::rect(15.0, 20.0, 20.0, 40.0)),
            MultiPolygon::from(Polygon::rect(15.0, 40.0, 35.0, 45.0)),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
        )
    }

    #[test]
    fn edge_kernels_cover_the_full_square() {
        let kernels =
            ScoringKernels::new(Point::new(1.0, 1.0), Point::new(-1.0, 1.0), &ScoringParams::default());
        for k in std::iter::once(kernels.projection()).chain(kernels.shade().iter()) {
            assert_eq!((k.half_width(), k.half_height()), (9, 9));
            assert_eq!(k.shift(), 0.0);
        }
        // diagonal taps beyond the inscribed disc survive
        assert!(kernels
            .projection()
            .taps()
            .iter()
            .any(|t| t.dx * t.dx + t.dy * t.dy > 81));
    }

    #[test]
    fn flat_tile_scores_zero() {
        let data = vec![128u8; 64 * 64];
        let tile = ImageView::from_slice(&data, 64, 64).unwrap();
        let e = square_structure().estimate(tile, &ScoringParams::default(), None);
        assert_eq!(e.projection, 0.0);
        assert_eq!(e.shade, 0.0);
        let expected = 1.0 / (1.0 + (20.0 * (128.0 / 255.0 - 0.3f64)).exp());
        assert!((e.shade_weight - expected).abs() < 1e-12);
    }

    #[test]
    fn dark_shade_area_raises_weight() {
        let mut data = vec![200u8; 64 * 64];
        for y in 40..45 {
            for x in 15..35 {
                data[y * 64 + x] = 10;
            }
        }
        let tile = ImageView::from_slice(&data, 64, 64).unwrap();
        let s = square_structure();
        assert!((s.shade_brightness(tile) - 10.0 / 255.0).abs() < 1e-12);
        let e = s.estimate(tile, &ScoringParams::default(), None);
        assert!(e.shade_weight > 0.99);
        assert!(e.shade > 0.0);
    }

    #[test]
    fn empty_structure_is_guarded() {
        let data = vec![0u8; 16];
        let tile = ImageView::from_slice(&data, 4, 4).unwrap();
        let e = Structure::default().estimate(tile, &ScoringParams::default(), None);
        assert_eq!(e.projection, 0.0);
        assert_eq!(e.shade, 0.0);
        assert!(e.shade_weight < 1e-5);
    }

    #[test]
    fn evidence_maps_replace_wall_kernel() {
        let data = vec![128u8; 64 * 64];
        let tile = ImageView::from_slice(&data, 64, 64).unwrap();
        let map = OwnedImage::from_fn(64, 64, |x, _| if x < 20 { 200u8 } else { 0 }).unwrap();
        let maps = [map];
        let e = square_structure().estimate(tile, &ScoringParams::default(), Some(&maps[..]));
        assert!(e.projection > 0.0);
        let without = square_structure().estimate(tile, &ScoringParams::default(), Some(&maps[..0]));
        assert_eq!(without.projection, 0.0);
    }
}
