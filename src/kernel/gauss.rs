//! Gaussian kernel generators.
//!
//! The directed derivatives model edges along an angle `theta`: `r` is the
//! offset projected onto the direction and `s` the perpendicular offset.
//! Responses vanish once `|s|` reaches `span`, so a small span yields a
//! line-shaped kernel.

use crate::kernel::KernelFn;
use std::f64::consts::PI;

/// Span large enough to never cut a Gaussian.
pub const UNBOUNDED_SPAN: f64 = 1.0e8;

/// Isotropic Gaussian.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gaussian {
    sigma: f64,
    span_sq: f64,
    factor: f64,
}

impl Gaussian {
    /// Normalized Gaussian without radial cut-off.
    pub fn new(sigma: f64) -> Self {
        Self::with_span(sigma, UNBOUNDED_SPAN, true)
    }

    /// Gaussian cut at radius `span`; `normed` applies `1 / (sqrt(2 pi) sigma)`.
    pub fn with_span(sigma: f64, span: f64, normed: bool) -> Self {
        let factor = if normed {
            1.0 / ((2.0 * PI).sqrt() * sigma)
        } else {
            1.0
        };
        Self {
            sigma,
            span_sq: span * span,
            factor,
        }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl KernelFn for Gaussian {
    fn value(&self, x: f64, y: f64) -> f64 {
        let r2 = x * x + y * y;
        if r2 < self.span_sq {
            self.factor * (-r2 / (2.0 * self.sigma * self.sigma)).exp()
        } else {
            0.0
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Directed {
    cos: f64,
    sin: f64,
    sigma: f64,
    span: f64,
    factor: f64,
}

impl Directed {
    fn new(angle: f64, sigma: f64, span: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            cos,
            sin,
            sigma,
            span,
            factor: 1.0 / ((2.0 * PI).sqrt() * sigma.powi(3)),
        }
    }

    /// Returns `(r, envelope)` or `None` outside the span.
    #[inline]
    fn project(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let r = x * self.cos + y * self.sin;
        let s = -x * self.sin + y * self.cos;
        if s.abs() >= self.span {
            return None;
        }
        let envelope = self.factor * (-r * r / (2.0 * self.sigma * self.sigma)).exp();
        Some((r, envelope))
    }
}

/// First derivative of a Gaussian along `angle`; a one-sided step detector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FirstDirectedDerivative(Directed);

impl FirstDirectedDerivative {
    pub fn new(angle: f64, sigma: f64, span: f64) -> Self {
        Self(Directed::new(angle, sigma, span))
    }
}

impl KernelFn for FirstDirectedDerivative {
    fn value(&self, x: f64, y: f64) -> f64 {
        self.0.project(x, y).map_or(0.0, |(r, env)| r * env)
    }
}

/// Second derivative of a Gaussian along `angle`; a ridge detector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SecondDirectedDerivative(Directed);

impl SecondDirectedDerivative {
    pub fn new(angle: f64, sigma: f64, span: f64) -> Self {
        Self(Directed::new(angle, sigma, span))
    }
}

impl KernelFn for SecondDirectedDerivative {
    fn value(&self, x: f64, y: f64) -> f64 {
        let sigma_sq = self.0.sigma * self.0.sigma;
        self.0
            .project(x, y)
            .map_or(0.0, |(r, env)| (1.0 - r * r / sigma_sq) * env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_peak_matches_normalization() {
        let g = Gaussian::new(2.0);
        let expected = 1.0 / ((2.0 * PI).sqrt() * 2.0);
        assert!((g.value(0.0, 0.0) - expected).abs() < 1e-12);
        assert!(g.value(3.0, 0.0) < g.value(1.0, 0.0));
        let cut = Gaussian::with_span(2.0, 1.5, false);
        assert_eq!(cut.value(0.0, 0.0), 1.0);
        assert_eq!(cut.value(1.5, 0.0), 0.0);
    }

    #[test]
    fn first_derivative_is_odd_along_direction() {
        let d = FirstDirectedDerivative::new(0.0, 3.0, 0.5);
        assert!(d.value(2.0, 0.0) > 0.0);
        assert!((d.value(2.0, 0.0) + d.value(-2.0, 0.0)).abs() < 1e-15);
        assert_eq!(d.value(2.0, 1.0), 0.0);
        assert_eq!(d.value(0.0, 0.0), 0.0);
    }

    #[test]
    fn rotated_derivative_follows_angle() {
        let d = FirstDirectedDerivative::new(PI / 2.0, 3.0, 0.5);
        assert!(d.value(0.0, 2.0) > 0.0);
        assert_eq!(d.value(2.0, 0.0), 0.0);
    }

    #[test]
    fn second_derivative_changes_sign_at_sigma() {
        let d = SecondDirectedDerivative::new(0.0, 2.0, 0.5);
        assert!(d.value(0.0, 0.0) > 0.0);
        assert!(d.value(3.0, 0.0) < 0.0);
        assert!(d.value(2.0, 0.0).abs() < 1e-15);
    }
}
