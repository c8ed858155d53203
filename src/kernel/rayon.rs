//! Rayon-parallel convolution (feature-gated).
//!
//! Rows are distributed across threads; each row is computed exactly as in
//! `SparseKernel::convolve`, so results are identical.

use crate::image::{ImageView, OwnedImage};
use crate::kernel::SparseKernel;
use crate::util::RoofShadeResult;
use rayon::prelude::*;

/// Row-parallel version of `SparseKernel::convolve`.
pub fn convolve_par<T>(
    kernel: &SparseKernel,
    image: ImageView<'_, T>,
    mask: Option<ImageView<'_, u8>>,
) -> RoofShadeResult<OwnedImage<i32>>
where
    T: Copy + Into<i64> + Sync,
{
    let (width, height) = (image.width(), image.height());
    SparseKernel::check_mask(width, height, mask)?;
    let Some((x0, x1, y0, y1)) = kernel.interior(width, height) else {
        return OwnedImage::zeros(width, height);
    };

    let rows: Vec<Vec<i32>> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut row = vec![0i32; width];
            if y < y0 || y >= y1 {
                return row;
            }
            for (x, cell) in row.iter_mut().enumerate().take(x1).skip(x0) {
                if mask.is_some_and(|m| m.get(x, y) == Some(0)) {
                    continue;
                }
                *cell = kernel.apply(image, x as i64, y as i64);
            }
            row
        })
        .collect();

    OwnedImage::from_vec(rows.concat(), width, height)
}
