//! Owned single-band image buffers.

use crate::image::ImageView;
use crate::util::{RoofShadeError, RoofShadeResult};

/// Owned contiguous single-band image.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: Copy + Default> OwnedImage<T> {
    /// Allocates an image filled with `T::default()`.
    pub fn zeros(width: usize, height: usize) -> RoofShadeResult<Self> {
        let len = checked_area(width, height)?;
        Ok(Self {
            data: vec![T::default(); len],
            width,
            height,
        })
    }

    /// Wraps a row-major buffer of exactly `width * height` elements.
    pub fn from_vec(data: Vec<T>, width: usize, height: usize) -> RoofShadeResult<Self> {
        let needed = checked_area(width, height)?;
        if data.len() < needed {
            return Err(RoofShadeError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(RoofShadeError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Copies a possibly strided view into a contiguous buffer.
    pub fn from_view(view: ImageView<'_, T>) -> RoofShadeResult<Self> {
        let mut data = Vec::with_capacity(view.width() * view.height());
        for y in 0..view.height() {
            let row = view.row(y).ok_or(RoofShadeError::BufferTooSmall {
                needed: (y + 1) * view.stride(),
                got: view.as_slice().len(),
            })?;
            data.extend_from_slice(row);
        }
        Self::from_vec(data, view.width(), view.height())
    }

    /// Builds an image by evaluating `f(x, y)` per pixel.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> RoofShadeResult<Self>
    where
        F: FnMut(usize, usize) -> T,
    {
        let len = checked_area(width, height)?;
        let mut data = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, T> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the contiguous pixel buffer.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Returns the pixel at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }

    /// Returns a mutable reference to the pixel at `(x, y)`.
    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get_mut(y * self.width + x)
    }

    /// Mutable row `y`.
    pub(crate) fn row_mut(&mut self, y: usize) -> &mut [T] {
        let start = y * self.width;
        &mut self.data[start..start + self.width]
    }
}

impl OwnedImage<i32> {
    /// Rescales to 8 bits by `255 / max`, clamping negatives to zero.
    ///
    /// An image without positive values maps to all zeros.
    pub fn normalize_to_u8(&self) -> OwnedImage<u8> {
        let max = self.data.iter().copied().max().unwrap_or(0);
        let scale = if max > 0 { 255.0 / max as f64 } else { 0.0 };
        OwnedImage {
            data: self
                .data
                .iter()
                .map(|&v| (v as f64 * scale).round().clamp(0.0, 255.0) as u8)
                .collect(),
            width: self.width,
            height: self.height,
        }
    }
}

fn checked_area(width: usize, height: usize) -> RoofShadeResult<usize> {
    if width == 0 || height == 0 {
        return Err(RoofShadeError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .ok_or(RoofShadeError::InvalidDimensions { width, height })
}
