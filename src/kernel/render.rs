//! Rendering polygon boundaries into soft evidence masks.

use crate::geometry::MultiPolygon;
use crate::image::OwnedImage;
use crate::kernel::{Gaussian, SparseKernel, DEFAULT_ZERO_THRESHOLD};
use crate::util::RoofShadeResult;

/// Stamps `kernel` at every boundary sample of `polygons` (spaced by
/// `step`), keeping the per-pixel maximum weight.
pub fn render_boundary(
    polygons: &MultiPolygon,
    kernel: &SparseKernel,
    width: usize,
    height: usize,
    step: f64,
) -> RoofShadeResult<OwnedImage<i32>> {
    let mut out = OwnedImage::<i32>::zeros(width, height)?;
    for p in polygons.segmentize(step) {
        let (cx, cy) = (p.x.floor() as i64, p.y.floor() as i64);
        for tap in kernel.taps() {
            let (x, y) = (cx + tap.dx as i64, cy + tap.dy as i64);
            if x < 0 || y < 0 {
                continue;
            }
            if let Some(cell) = out.get_mut(x as usize, y as usize) {
                *cell = (*cell).max(tap.weight);
            }
        }
    }
    Ok(out)
}

/// Renders each segment as a blurred 8-bit outline using a Gaussian of
/// `sigma` sampled on a disc of radius `half_size`.
pub fn render_segments(
    segments: &[MultiPolygon],
    sigma: f64,
    half_size: usize,
    width: usize,
    height: usize,
) -> RoofShadeResult<Vec<OwnedImage<u8>>> {
    let kernel = SparseKernel::rectangular(
        &Gaussian::new(sigma),
        half_size,
        half_size,
        DEFAULT_ZERO_THRESHOLD,
    );
    segments
        .iter()
        .map(|segment| {
            render_boundary(segment, &kernel, width, height, 1.0).map(|img| img.normalize_to_u8())
        })
        .collect()
}
