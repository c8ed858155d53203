//! Error types for roofshade.

use thiserror::Error;

/// Result alias for roofshade operations.
pub type RoofShadeResult<T> = std::result::Result<T, RoofShadeError>;

/// Errors surfaced by constructors and adapters.
///
/// Scoring and search never fail on bad data; they degrade to empty geometry
/// or zero responses instead.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RoofShadeError {
    /// Width or height is zero or overflows.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Stride is smaller than the row width.
    #[error("stride {stride} is smaller than width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is too short for the declared layout.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A requested window does not fit the image.
    #[error("window ({x}, {y}, {width}x{height}) out of bounds for {img_width}x{img_height}")]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// Unsupported number of interleaved bands.
    #[error("unsupported band count {bands}")]
    InvalidBands { bands: usize },
    /// Length range is empty or starts below 1.
    #[error("invalid length range [{from}, {to}]")]
    InvalidRange { from: u32, to: u32 },
    /// Per-view inputs do not match the number of views.
    #[error("expected {expected} views, got {got}")]
    ViewCountMismatch { expected: usize, got: usize },
    /// Footprint has no usable area.
    #[error("degenerate footprint: {reason}")]
    DegenerateFootprint { reason: &'static str },
    /// Affine transform cannot be inverted.
    #[error("transform is not invertible")]
    SingularTransform,
    /// Polygon clipping backend failure.
    #[error("geometry operation failed: {reason}")]
    Geometry { reason: String },
    /// Image decode failure (feature `image-io`).
    #[error("image io failed: {reason}")]
    ImageIo { reason: String },
}
