//! Loading raster tiles through the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::Tile;
use crate::util::{RoofShadeError, RoofShadeResult};
use std::path::Path;

/// Converts a decoded image into an interleaved tile.
///
/// Gray inputs stay single-band; everything else is expanded to RGB.
pub fn tile_from_dynamic_image(img: &image::DynamicImage) -> RoofShadeResult<Tile> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    match img {
        image::DynamicImage::ImageLuma8(gray) => Tile::new(gray.as_raw().clone(), width, height, 1),
        other => Tile::new(other.to_rgb8().into_raw(), width, height, 3),
    }
}

/// Loads an image from disk as a tile.
pub fn load_tile<P: AsRef<Path>>(path: P) -> RoofShadeResult<Tile> {
    let img = image::open(path).map_err(|err| RoofShadeError::ImageIo {
        reason: err.to_string(),
    })?;
    tile_from_dynamic_image(&img)
}
