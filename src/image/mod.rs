//! Raster tiles and image buffers.
//!
//! `ImageView` borrows a row-major buffer with an explicit stride, `OwnedImage`
//! owns a contiguous single-band buffer, and `Tile` holds interleaved 8-bit
//! bands as read from a raster window. Sampling helpers take signed
//! coordinates and clamp to the image border, which is how kernels and
//! boundary scans stay total near tile edges.

use crate::util::{RoofShadeError, RoofShadeResult};

#[cfg(feature = "image-io")]
pub mod io;
mod owned;
mod tile;

pub use owned::OwnedImage;
pub use tile::Tile;

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T: Copy> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> RoofShadeResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> RoofShadeResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(RoofShadeError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.stride + x).copied()
    }

    /// Returns the element at signed `(x, y)`, clamped to the border.
    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64) -> T {
        let cx = x.clamp(0, self.width as i64 - 1) as usize;
        let cy = y.clamp(0, self.height as i64 - 1) as usize;
        self.data[cy * self.stride + cx]
    }

    /// Returns the element at signed `(x, y)` when it lies inside the image.
    #[inline]
    pub fn get_signed(&self, x: i64, y: i64) -> Option<T> {
        if x < 0 || y < 0 {
            return None;
        }
        self.get(x as usize, y as usize)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.stride;
        self.data.get(start..start + self.width)
    }

    /// Returns a zero-copy window into the same backing buffer.
    pub fn roi(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> RoofShadeResult<ImageView<'a, T>> {
        if width == 0 || height == 0 {
            return Err(RoofShadeError::InvalidDimensions { width, height });
        }
        let out_of_bounds = RoofShadeError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };
        let end_x = x.checked_add(width).ok_or_else(|| out_of_bounds.clone())?;
        let end_y = y.checked_add(height).ok_or_else(|| out_of_bounds.clone())?;
        if end_x > self.width || end_y > self.height {
            return Err(out_of_bounds);
        }
        let start = y * self.stride + x;
        ImageView::new(&self.data[start..], width, height, self.stride)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> RoofShadeResult<usize> {
    if width == 0 || height == 0 {
        return Err(RoofShadeError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(RoofShadeError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(RoofShadeError::InvalidDimensions { width, height })
}
