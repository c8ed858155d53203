//! Windowed non-maximum suppression over dense response surfaces.

use crate::candidate::peak::{sort_peaks_desc, Peak};
use crate::image::ImageView;

/// Returns local maxima of `surface`, sorted by descending score.
///
/// A pixel survives when it is non-zero and no pixel within the
/// `(2 * half_width + 1)`-square window (clamped to the surface) is strictly
/// greater. Plateaus therefore keep every tied pixel.
pub fn local_maxima(surface: ImageView<'_, f64>, half_width: usize) -> Vec<Peak> {
    let (width, height) = (surface.width(), surface.height());
    let mut peaks = Vec::new();
    for y in 0..height {
        let Some(row) = surface.row(y) else {
            continue;
        };
        let wy0 = y.saturating_sub(half_width);
        let wy1 = (y + half_width).min(height - 1);
        for (x, &score) in row.iter().enumerate() {
            if score == 0.0 || score.is_nan() {
                continue;
            }
            let wx0 = x.saturating_sub(half_width);
            let wx1 = (x + half_width).min(width - 1);
            let dominated = (wy0..=wy1).any(|ny| {
                surface
                    .row(ny)
                    .is_some_and(|r| r[wx0..=wx1].iter().any(|&v| v > score))
            });
            if !dominated {
                peaks.push(Peak { x, y, score });
            }
        }
    }
    sort_peaks_desc(&mut peaks);
    peaks
}
