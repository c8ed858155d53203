//! Scanline rasterization of polygons onto a pixel grid.
//!
//! A pixel belongs to the polygon when its centre `(x + 0.5, y + 0.5)` is
//! inside under the even-odd rule over all rings, so holes stay empty.

use crate::geometry::{MultiPolygon, Point};

/// Calls `visit(x, y)` for every pixel of a `width x height` grid whose
/// centre lies inside `polygons`.
pub fn for_each_pixel_inside<F>(polygons: &MultiPolygon, width: usize, height: usize, mut visit: F)
where
    F: FnMut(usize, usize),
{
    if polygons.is_empty() || width == 0 || height == 0 {
        return;
    }
    let bbox = polygons.bbox();
    let y0 = (bbox.min.y - 0.5).ceil().max(0.0);
    let y1 = (bbox.max.y - 0.5).floor().min(height as f64 - 1.0);
    if y0 > y1 {
        return;
    }
    let edges: Vec<(Point, Point)> = polygons.rings().flat_map(|r| r.edges()).collect();
    let mut crossings: Vec<f64> = Vec::new();
    for y in y0 as usize..=y1 as usize {
        let cy = y as f64 + 0.5;
        crossings.clear();
        for &(a, b) in &edges {
            if (a.y > cy) != (b.y > cy) {
                crossings.push(a.x + (cy - a.y) / (b.y - a.y) * (b.x - a.x));
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));
        for span in crossings.chunks_exact(2) {
            let xa = (span[0] - 0.5).ceil().max(0.0);
            let xb = (span[1] - 0.5).floor().min(width as f64 - 1.0);
            if xa > xb {
                continue;
            }
            for x in xa as usize..=xb as usize {
                // Centres exactly on the right boundary stay outside.
                if (x as f64 + 0.5) < span[1] {
                    visit(x, y);
                }
            }
        }
    }
}
