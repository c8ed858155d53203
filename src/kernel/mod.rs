//! Directional kernels and sparse convolution.
//!
//! Continuous generators (`gauss`) are sampled into integer `SparseKernel`s,
//! which are then applied at arbitrary points or over whole tiles.

pub mod gauss;
pub mod render;
pub mod sparse;

#[cfg(feature = "rayon")]
pub mod rayon;

pub use gauss::{FirstDirectedDerivative, Gaussian, SecondDirectedDerivative};
pub use sparse::{SparseKernel, SparseTap, DEFAULT_ZERO_THRESHOLD};

/// A continuous kernel generator evaluated at a 2D offset.
pub trait KernelFn {
    /// Response at offset `(x, y)` from the kernel centre.
    fn value(&self, x: f64, y: f64) -> f64;
}

