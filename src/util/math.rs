//! Scalar helpers shared by kernels and scoring.

use nalgebra::Vector2;
use std::f64::consts::PI;

/// Converts a vector to `(radius, angle)`.
///
/// Angles below zero are folded to `PI + angle`, so the result lies in
/// `[0, PI]` and opposite vectors map to the same angle.
pub(crate) fn to_polar(v: Vector2<f64>) -> (f64, f64) {
    let radius = v.norm();
    let mut angle = v.y.atan2(v.x);
    if angle < 0.0 {
        angle += PI;
    }
    (radius, angle)
}

/// Logistic weight that favours dark regions as plausible shadow.
///
/// `brightness` is normalized to `[0, 1]`; the midpoint sits at 0.3.
pub(crate) fn shade_weight(brightness: f64) -> f64 {
    1.0 / (1.0 + (20.0 * (brightness - 0.3)).exp())
}

/// Largest absolute component over a set of vectors.
pub(crate) fn max_abs_component<'a, I>(vectors: I) -> f64
where
    I: IntoIterator<Item = &'a Vector2<f64>>,
{
    vectors
        .into_iter()
        .fold(0.0f64, |acc, v| acc.max(v.x.abs()).max(v.y.abs()))
}

/// Rounds half away from zero and saturates to `i32`.
pub(crate) fn round_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

#[cfg(test)]
mod tests {
    use super::{max_abs_component, round_i32, shade_weight, to_polar};
    use nalgebra::Vector2;
    use std::f64::consts::PI;

    #[test]
    fn to_polar_folds_negative_angles() {
        let (r, a) = to_polar(Vector2::new(0.0, -2.0));
        assert!((r - 2.0).abs() < 1e-12);
        assert!((a - PI / 2.0).abs() < 1e-12);

        let (_, a) = to_polar(Vector2::new(1.0, 0.0));
        assert!(a.abs() < 1e-12);
    }

    #[test]
    fn shade_weight_midpoint_is_half() {
        assert!((shade_weight(0.3) - 0.5).abs() < 1e-12);
        assert!(shade_weight(0.0) > 0.99);
        assert!(shade_weight(1.0) < 1e-5);
    }

    #[test]
    fn max_abs_component_scans_all_vectors() {
        let vs = [Vector2::new(0.5, -3.0), Vector2::new(2.0, 1.0)];
        assert_eq!(max_abs_component(vs.iter()), 3.0);
        assert_eq!(max_abs_component(std::iter::empty::<&Vector2<f64>>()), 0.0);
    }

    #[test]
    fn round_i32_saturates() {
        assert_eq!(round_i32(2.5), 3);
        assert_eq!(round_i32(-2.5), -3);
        assert_eq!(round_i32(f64::INFINITY), i32::MAX);
        assert_eq!(round_i32(f64::NAN), 0);
    }
}
