//! Multi-band 8-bit raster tiles.

use crate::image::OwnedImage;
use crate::util::{RoofShadeError, RoofShadeResult};

/// Interleaved 8-bit tile read from a raster window.
///
/// Bands are stored pixel-interleaved in raster band order; three or four
/// bands are taken as R, G, B(, A), which is how `image` decodes files and
/// how GDAL numbers the bands of RGB products. Sources holding BGR data must
/// reorder before building the tile. An empty tile (zero area) stands for a
/// view without data.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    data: Vec<u8>,
    width: usize,
    height: usize,
    bands: usize,
}

impl Tile {
    /// Wraps an interleaved buffer.
    pub fn new(data: Vec<u8>, width: usize, height: usize, bands: usize) -> RoofShadeResult<Self> {
        if bands == 0 || bands > 4 {
            return Err(RoofShadeError::InvalidBands { bands });
        }
        let needed = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(bands))
            .ok_or(RoofShadeError::InvalidDimensions { width, height })?;
        if data.len() != needed {
            return Err(RoofShadeError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            bands,
        })
    }

    /// Tile without pixels.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
            bands: 1,
        }
    }


    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// True when the tile has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Converts to a single gray band using BT.601 luma weights.
    ///
    /// Band 0 is red, band 1 green and band 2 blue; a fourth band is ignored
    /// and two-band (gray + alpha) tiles keep their first band.
    pub fn to_gray(&self) -> RoofShadeResult<OwnedImage<u8>> {
        let gray = match self.bands {
            1 => self.data.clone(),
            2 => self.data.chunks_exact(2).map(|px| px[0]).collect(),
            _ => self
                .data
                .chunks_exact(self.bands)
                .map(|px| {
                    let luma = 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64;
                    luma.round().clamp(0.0, 255.0) as u8
                })
                .collect(),
        };
        OwnedImage::from_vec(gray, self.width, self.height)
    }

    /// Copies a window, clipping it to the tile.
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize) -> RoofShadeResult<Tile> {
        if x >= self.width || y >= self.height {
            return Err(RoofShadeError::RoiOutOfBounds {
                x,
                y,
                width,
                height,
                img_width: self.width,
                img_height: self.height,
            });
        }
        let w = width.min(self.width - x);
        let h = height.min(self.height - y);
        let mut data = Vec::with_capacity(w * h * self.bands);
        for row in y..y + h {
            let start = (row * self.width + x) * self.bands;
            data.extend_from_slice(&self.data[start..start + w * self.bands]);
        }
        Tile::new(data, w, h, self.bands)
    }
}

#[cfg(test)]
mod tests {
    use super::Tile;
    use crate::util::RoofShadeError;

    #[test]
    fn to_gray_uses_luma_weights() {
        let tile = Tile::new(vec![255, 0, 0, 0, 255, 0, 0, 0, 255], 3, 1, 3).unwrap();
        let gray = tile.to_gray().unwrap();
        assert_eq!(gray.data(), &[76, 150, 29]);
    }

    #[test]
    fn gray_follows_rgb_band_order() {
        // a BGR reading of this pixel would give 0.114*200 + 0.299*10 = 26
        let rgba = Tile::new(vec![200, 0, 10, 255], 1, 1, 4).unwrap();
        assert_eq!(rgba.to_gray().unwrap().data(), &[61]);
        let gray_alpha = Tile::new(vec![90, 255], 1, 1, 2).unwrap();
        assert_eq!(gray_alpha.to_gray().unwrap().data(), &[90]);
    }

    #[test]
    fn crop_clips_to_tile() {
        let tile = Tile::new((0u8..16).collect(), 4, 4, 1).unwrap();
        let crop = tile.crop(2, 2, 5, 5).unwrap();
        assert_eq!(crop.width(), 2);
        assert_eq!(crop.data(), &[10, 11, 14, 15]);
    }

    #[test]
    fn rejects_unsupported_bands() {
        let err = Tile::new(vec![0; 5], 1, 1, 5).err().unwrap();
        assert_eq!(err, RoofShadeError::InvalidBands { bands: 5 });
    }
}
