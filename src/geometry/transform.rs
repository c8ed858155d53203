//! Affine and linear transforms between world and raster frames.
//!
//! Transforms are `nalgebra::Matrix3` in homogeneous column form, so a point
//! maps as `M * [x, y, 1]`. Direction vectors only see the upper-left 2x2
//! block.

use crate::geometry::Point;
use crate::util::{RoofShadeError, RoofShadeResult};
use nalgebra::{Matrix2, Matrix3, Vector3};

/// Maps a point through an affine transform.
#[inline]
pub fn apply_affine(m: &Matrix3<f64>, p: Point) -> Point {
    let h = m * Vector3::new(p.x, p.y, 1.0);
    Point::new(h.x, h.y)
}

/// Upper-left linear block of an affine transform.
pub fn linear_block(m: &Matrix3<f64>) -> Matrix2<f64> {
    m.fixed_view::<2, 2>(0, 0).into_owned()
}

/// Maps a direction vector through the linear part of a transform.
#[inline]
pub fn apply_linear(m: &Matrix3<f64>, v: Point) -> Point {
    linear_block(m) * v
}

/// Inverts an affine transform.
pub fn invert(m: &Matrix3<f64>) -> RoofShadeResult<Matrix3<f64>> {
    m.try_inverse().ok_or(RoofShadeError::SingularTransform)
}

/// Pure translation.
pub fn translation(shift: Point) -> Matrix3<f64> {
    Matrix3::new(1.0, 0.0, shift.x, 0.0, 1.0, shift.y, 0.0, 0.0, 1.0)
}

/// Raster-to-world transform from GDAL-style geotransform coefficients
/// `[x0, dx, rx, y0, ry, dy]`.
pub fn from_geo_transform(gt: [f64; 6]) -> Matrix3<f64> {
    Matrix3::new(gt[1], gt[2], gt[0], gt[4], gt[5], gt[3], 0.0, 0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_transform_round_trips_through_inverse() {
        let r2w = from_geo_transform([500.0, 0.5, 0.0, 1000.0, 0.0, -0.5]);
        let w2r = invert(&r2w).unwrap();
        let world = apply_affine(&r2w, Point::new(10.0, 20.0));
        assert_eq!(world, Point::new(505.0, 990.0));
        let back = apply_affine(&w2r, world);
        assert!((back - Point::new(10.0, 20.0)).norm() < 1e-9);
        assert!((apply_linear(&w2r, Point::new(1.0, 1.0)) - Point::new(2.0, -2.0)).norm() < 1e-12);
    }

    #[test]
    fn singular_transform_is_rejected() {
        let m = Matrix3::zeros();
        assert_eq!(invert(&m), Err(RoofShadeError::SingularTransform));
    }
}
