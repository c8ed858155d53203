//! Quantized sparse convolution kernels.
//!
//! A generator is sampled on an integer grid, near-zero samples are dropped,
//! and the survivors are quantized to integers in units of the smallest
//! surviving magnitude. Responses are normalized by
//! `scale = max(sum of positive weights, sum of negative weights)`, which
//! bounds them to roughly `[-1, 1]` times the input range.

use crate::image::{ImageView, OwnedImage};
use crate::kernel::KernelFn;
use crate::util::math::round_i32;
use crate::util::{RoofShadeError, RoofShadeResult};

/// Samples at or below this magnitude are dropped.
pub const DEFAULT_ZERO_THRESHOLD: f64 = 1e-4;

/// One non-zero kernel entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SparseTap {
    pub dx: i32,
    pub dy: i32,
    pub weight: i32,
}

/// Integer kernel stored as a list of taps.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseKernel {
    taps: Vec<SparseTap>,
    half_width: usize,
    half_height: usize,
    scale: i64,
    shift: f64,
}

struct Quantized {
    taps: Vec<SparseTap>,
    positive: i64,
    negative: i64,
}

fn quantize(samples: Vec<(i32, i32, f64)>, zero_threshold: f64) -> Quantized {
    let kept: Vec<(i32, i32, f64)> = samples
        .into_iter()
        .filter(|&(_, _, v)| v.abs() > zero_threshold)
        .collect();
    let unit = kept
        .iter()
        .map(|&(_, _, v)| v.abs())
        .fold(f64::INFINITY, f64::min);
    let mut positive = 0i64;
    let mut negative = 0i64;
    let taps = kept
        .into_iter()
        .map(|(dx, dy, v)| {
            let weight = round_i32(v / unit);
            if weight > 0 {
                positive += weight as i64;
            } else {
                negative -= weight as i64;
            }
            SparseTap { dx, dy, weight }
        })
        .collect();
    Quantized {
        taps,
        positive,
        negative,
    }
}

impl SparseKernel {
    /// Samples `f` over `[-half_width, half_width] x [-half_height, half_height]`.
    pub fn rectangular<K: KernelFn>(
        f: &K,
        half_width: usize,
        half_height: usize,
        zero_threshold: f64,
    ) -> Self {
        let hw = half_width as i32;
        let hh = half_height as i32;
        let mut samples = Vec::with_capacity(((2 * hw + 1) * (2 * hh + 1)) as usize);
        for dy in -hh..=hh {
            for dx in -hw..=hw {
                samples.push((dx, dy, f.value(dx as f64, dy as f64)));
            }
        }
        let q = quantize(samples, zero_threshold);
        Self {
            taps: q.taps,
            half_width,
            half_height,
            scale: q.positive.max(q.negative),
            shift: 0.0,
        }
    }

    /// Samples `f` over the disc of radius `half_size`.
    ///
    /// The response is offset by `127 * (neg - pos) / min(pos, neg)` so that
    /// unbalanced kernels centre their output; a one-signed kernel gets no
    /// offset.
    pub fn circular<K: KernelFn>(f: &K, half_size: usize, zero_threshold: f64) -> Self {
        let h = half_size as i32;
        let r2 = h * h;
        let mut samples = Vec::new();
        for dy in -h..=h {
            for dx in -h..=h {
                if dx * dx + dy * dy > r2 {
                    continue;
                }
                samples.push((dx, dy, f.value(dx as f64, dy as f64)));
            }
        }
        let q = quantize(samples, zero_threshold);
        let smaller = q.positive.min(q.negative);
        let shift = if smaller > 0 {
            127.0 * (q.negative - q.positive) as f64 / smaller as f64
        } else {
            0.0
        };
        Self {
            taps: q.taps,
            half_width: half_size,
            half_height: half_size,
            scale: q.positive.max(q.negative),
            shift,
        }
    }

    pub fn taps(&self) -> &[SparseTap] {
        &self.taps
    }

    pub fn half_width(&self) -> usize {
        self.half_width
    }

    pub fn half_height(&self) -> usize {
        self.half_height
    }

    /// Normalizing divisor; zero for an empty kernel.
    pub fn scale(&self) -> i64 {
        self.scale
    }

    /// Constant added to every normalized response.
    pub fn shift(&self) -> f64 {
        self.shift
    }

    /// Response centred at `(x, y)`; taps outside the image read the nearest
    /// border pixel.
    #[inline]
    pub fn apply<T>(&self, image: ImageView<'_, T>, x: i64, y: i64) -> i32
    where
        T: Copy + Into<i64>,
    {
        if self.scale == 0 {
            return 0;
        }
        let sum: i64 = self
            .taps
            .iter()
            .map(|t| {
                let v: i64 = image.get_clamped(x + t.dx as i64, y + t.dy as i64).into();
                v * t.weight as i64
            })
            .sum();
        round_i32(sum as f64 / self.scale as f64 + self.shift)
    }

    pub(crate) fn interior(&self, width: usize, height: usize) -> Option<(usize, usize, usize, usize)> {
        let (hw, hh) = (self.half_width, self.half_height);
        if width <= 2 * hw || height <= 2 * hh {
            return None;
        }
        Some((hw, width - hw, hh, height - hh))
    }

    pub(crate) fn check_mask(
        image_width: usize,
        image_height: usize,
        mask: Option<ImageView<'_, u8>>,
    ) -> RoofShadeResult<()> {
        if let Some(m) = mask {
            if m.width() != image_width || m.height() != image_height {
                return Err(RoofShadeError::InvalidDimensions {
                    width: m.width(),
                    height: m.height(),
                });
            }
        }
        Ok(())
    }

    /// Applies the kernel at every interior pixel.
    ///
    /// The half-kernel border stays zero, as do pixels where `mask` is zero.
    pub fn convolve<T>(
        &self,
        image: ImageView<'_, T>,
        mask: Option<ImageView<'_, u8>>,
    ) -> RoofShadeResult<OwnedImage<i32>>
    where
        T: Copy + Into<i64>,
    {
        self.convolve_strided(image, 1, mask)
    }

    /// Applies the kernel every `step` pixels and fills each `step x step`
    /// block with that response.
    pub fn convolve_strided<T>(
        &self,
        image: ImageView<'_, T>,
        step: usize,
        mask: Option<ImageView<'_, u8>>,
    ) -> RoofShadeResult<OwnedImage<i32>>
    where
        T: Copy + Into<i64>,
    {
        let (width, height) = (image.width(), image.height());
        Self::check_mask(width, height, mask)?;
        let mut out = OwnedImage::zeros(width, height)?;
        let Some((x0, x1, y0, y1)) = self.interior(width, height) else {
            return Ok(out);
        };
        let step = step.max(1);
        for y in (y0..y1).step_by(step) {
            for x in (x0..x1).step_by(step) {
                if mask.is_some_and(|m| m.get(x, y) == Some(0)) {
                    continue;
                }
                let value = self.apply(image, x as i64, y as i64);
                for by in y..(y + step).min(height) {
                    let row = out.row_mut(by);
                    for cell in &mut row[x..(x + step).min(width)] {
                        *cell = value;
                    }
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{FirstDirectedDerivative, Gaussian};

    #[test]
    fn quantization_uses_smallest_magnitude_as_unit() {
        let d = FirstDirectedDerivative::new(0.0, 3.0, 0.5);
        let k = SparseKernel::rectangular(&d, 9, 9, DEFAULT_ZERO_THRESHOLD);
        assert_eq!(k.taps().len(), 18);
        assert!(k.taps().iter().all(|t| t.dy == 0 && t.dx != 0));
        assert_eq!(k.taps().iter().map(|t| t.weight.abs()).min(), Some(1));
        let pos: i64 = k.taps().iter().filter(|t| t.weight > 0).map(|t| t.weight as i64).sum();
        assert_eq!(k.scale(), pos);
        assert_eq!(k.shift(), 0.0);
    }

    #[test]
    fn symmetric_derivative_on_flat_tile_returns_shift() {
        let d = FirstDirectedDerivative::new(0.7, 3.0, 0.5);
        let k = SparseKernel::circular(&d, 9, DEFAULT_ZERO_THRESHOLD);
        assert_eq!(k.shift(), 0.0);
        let data = vec![0u8; 32 * 32];
        let view = ImageView::from_slice(&data, 32, 32).unwrap();
        assert_eq!(k.apply(view, 16, 16), 0);
    }

    #[test]
    fn one_signed_kernel_has_no_shift() {
        let g = Gaussian::new(2.0);
        let k = SparseKernel::circular(&g, 6, DEFAULT_ZERO_THRESHOLD);
        assert_eq!(k.shift(), 0.0);
        let data = vec![100u8; 16 * 16];
        let view = ImageView::from_slice(&data, 16, 16).unwrap();
        assert_eq!(k.apply(view, 8, 8), 100);
    }

    #[test]
    fn empty_kernel_returns_zero() {
        let k = SparseKernel::rectangular(&Gaussian::new(1.0), 2, 2, 10.0);
        assert!(k.taps().is_empty());
        let data = vec![9u8; 4];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        assert_eq!(k.apply(view, 0, 0), 0);
    }

    #[test]
    fn convolve_responds_to_step_edge_and_skips_border() {
        let width = 30;
        let data: Vec<u8> = (0..width * width)
            .map(|i| if i % width < 15 { 0 } else { 200 })
            .collect();
        let view = ImageView::from_slice(&data, width, width).unwrap();
        let d = FirstDirectedDerivative::new(0.0, 3.0, 0.5);
        let k = SparseKernel::rectangular(&d, 9, 9, DEFAULT_ZERO_THRESHOLD);
        let out = k.convolve(view, None).unwrap();
        assert_eq!(out.get(3, 15), Some(0));
        assert!(out.get(15, 15).unwrap() > 0);
        assert_eq!(out.get(25, 15), Some(0));

        let mut mask = vec![1u8; width * width];
        mask[15 * width + 15] = 0;
        let mask_view = ImageView::from_slice(&mask, width, width).unwrap();
        let masked = k.convolve(view, Some(mask_view)).unwrap();
        assert_eq!(masked.get(15, 15), Some(0));
        assert_eq!(masked.get(14, 15), out.get(14, 15));
    }

    #[test]
    fn strided_convolution_fills_blocks() {
        let data: Vec<u8> = (0..400).map(|i| (i % 20 * 10) as u8).collect();
        let view = ImageView::from_slice(&data, 20, 20).unwrap();
        let d = FirstDirectedDerivative::new(0.0, 1.0, 0.5);
        let k = SparseKernel::rectangular(&d, 2, 2, DEFAULT_ZERO_THRESHOLD);
        let out = k.convolve_strided(view, 3, None).unwrap();
        assert_eq!(out.get(2, 2), out.get(4, 4));
        assert_eq!(out.get(2, 2), Some(k.apply(view, 2, 2)));
    }

    #[test]
    fn mismatched_mask_is_rejected() {
        let data = vec![0u8; 16];
        let view = ImageView::from_slice(&data, 4, 4).unwrap();
        let mask = ImageView::from_slice(&data[..8], 4, 2).unwrap();
        let k = SparseKernel::rectangular(&Gaussian::new(1.0), 1, 1, 0.0);
        assert!(k.convolve(view, Some(mask)).is_err());
    }
}
