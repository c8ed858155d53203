//! Raster access seam.
//!
//! Reconstruction only needs georeferencing and rectangular window reads, so
//! large raster stores plug in through [`RasterSource`]. [`MemoryRaster`]
//! serves a decoded image; [`SharedRaster`] serializes access for backends
//! that cannot be read from several threads at once.

use crate::image::Tile;
use crate::util::RoofShadeResult;
use nalgebra::Matrix3;
use std::sync::Mutex;

/// Georeferenced raster that can be read window by window.
pub trait RasterSource {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn bands(&self) -> usize;

    /// Affine map from pixel coordinates to world coordinates.
    fn raster_to_world(&self) -> Matrix3<f64>;

    /// Reads a window; windows reaching past the border are clipped.
    fn read_window(&self, x: usize, y: usize, width: usize, height: usize) -> RoofShadeResult<Tile>;
}

/// Raster held fully in memory.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryRaster {
    tile: Tile,
    raster_to_world: Matrix3<f64>,
}

impl MemoryRaster {
    pub fn new(tile: Tile, raster_to_world: Matrix3<f64>) -> Self {
        Self {
            tile,
            raster_to_world,
        }
    }

    pub fn tile(&self) -> &Tile {
        &self.tile
    }
}

impl RasterSource for MemoryRaster {
    fn width(&self) -> usize {
        self.tile.width()
    }

    fn height(&self) -> usize {
        self.tile.height()
    }

    fn bands(&self) -> usize {
        self.tile.bands()
    }

    fn raster_to_world(&self) -> Matrix3<f64> {
        self.raster_to_world
    }

    fn read_window(&self, x: usize, y: usize, width: usize, height: usize) -> RoofShadeResult<Tile> {
        self.tile.crop(x, y, width, height)
    }
}

/// Wraps a non-reentrant source so it can be shared between workers.
///
/// Metadata is captured once; only window reads take the lock.
pub struct SharedRaster<R> {
    inner: Mutex<R>,
    width: usize,
    height: usize,
    bands: usize,
    raster_to_world: Matrix3<f64>,
}

impl<R: RasterSource> SharedRaster<R> {
    pub fn new(inner: R) -> Self {
        Self {
            width: inner.width(),
            height: inner.height(),
            bands: inner.bands(),
            raster_to_world: inner.raster_to_world(),
            inner: Mutex::new(inner),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<R: RasterSource> RasterSource for SharedRaster<R> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn bands(&self) -> usize {
        self.bands
    }

    fn raster_to_world(&self) -> Matrix3<f64> {
        self.raster_to_world
    }

    fn read_window(&self, x: usize, y: usize, width: usize, height: usize) -> RoofShadeResult<Tile> {
        let guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.read_window(x, y, width, height)
    }
}
