//! Candidate selection over response surfaces.
//!
//! Includes ranked peaks and windowed non-maximum suppression.

pub(crate) mod nms;
pub(crate) mod peak;
