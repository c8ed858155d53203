//! Ranked response peaks.

use std::cmp::Ordering;

/// Local maximum of a response surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// Column of the peak.
    pub x: usize,
    /// Row of the peak.
    pub y: usize,
    /// Response value at the peak.
    pub score: f64,
}

pub(crate) fn peak_cmp_desc(a: &Peak, b: &Peak) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.x.cmp(&b.x))
}

/// Sorts peaks by descending score; ties resolve by row then column.
pub(crate) fn sort_peaks_desc(peaks: &mut [Peak]) {
    peaks.sort_by(peak_cmp_desc);
}
