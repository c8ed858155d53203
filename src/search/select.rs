//! Automatic choice of the final structure from ranked candidates.

use crate::search::multiview::MultiviewResponse;
use crate::search::structure::{ModelResponse, StructureCandidates};

/// Threshold on `length change / response change` below which the second
/// ranked multiview length is preferred over the first.
pub const MULTIVIEW_CHOICE_RATIO: f64 = 0.15;

/// Picks the structure of the best roof group.
///
/// Prefers the first non-baseline entry; falls back to the baseline when the
/// group holds nothing else.
pub fn choose_single_view(groups: &[StructureCandidates]) -> Option<&ModelResponse> {
    let group = groups.first()?;
    group.responses.get(1).or_else(|| group.responses.first())
}

/// Index of the multiview response to keep.
///
/// `linear_size` is the square root of the roof area in world units and
/// `max_length` the upper end of the length range.
pub fn choose_multiview(responses: &[MultiviewResponse], linear_size: f64, max_length: u32) -> usize {
    let [first, second, ..] = responses else {
        return 0;
    };
    let linear_size = linear_size.max(1.0);
    let gap = (second.response - first.response).abs() / linear_size;
    if !gap.is_finite() {
        return 0;
    }
    // gaps below one unit per linear size count as one
    let response_diff = gap.max(1.0);
    let length_diff =
        (second.length as f64 - first.length as f64).abs() / (max_length.max(1) as f64);
    if length_diff / response_diff < MULTIVIEW_CHOICE_RATIO {
        1
    } else {
        0
    }
}
