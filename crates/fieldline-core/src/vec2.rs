//! 2D vector arithmetic for field evaluation and line tracing.
//!
//! All field evaluators and the tracer work in image-plane coordinates, so the
//! vector type is deliberately plain: two `f64` components with the usual
//! operators plus the handful of angle helpers the tracer needs.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A 2D vector in image-plane coordinates, usable for positions, field
/// values and tangents alike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Unit vector in the same direction. The zero vector maps to itself.
    pub fn normalized(&self) -> Self {
        let d = self.norm();
        if d == 0.0 {
            *self
        } else {
            Self {
                x: self.x / d,
                y: self.y / d,
            }
        }
    }

    /// Dot product with another vector.
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 2D scalar cross product (z-component of the 3D cross product).
    pub fn cross(&self, other: &Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Counterclockwise rotation by `phi` radians.
    pub fn rotated(&self, phi: f64) -> Self {
        let (s, c) = phi.sin_cos();
        Self {
            x: c * self.x - s * self.y,
            y: c * self.y + s * self.x,
        }
    }

    /// Clockwise perpendicular, (y, -x).
    pub fn perp(&self) -> Self {
        Self {
            x: self.y,
            y: -self.x,
        }
    }

    /// Polar angle atan2(y, x).
    pub fn angle(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// True if both components are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

/// Cosine of the angle between two vectors, clamped to [-1, 1].
///
/// Returns 1 if either vector is zero; callers only evaluate this under
/// preconditions where a zero argument means "no turning".
pub fn cos_between(v1: &Vec2, v2: &Vec2) -> f64 {
    let dd = v1.norm() * v2.norm();
    if dd == 0.0 {
        return 1.0;
    }
    (v1.dot(v2) / dd).clamp(-1.0, 1.0)
}

/// Sine of the angle between two vectors, clamped to [-1, 1].
///
/// Returns 1 if either vector is zero, same convention as [`cos_between`].
pub fn sin_between(v1: &Vec2, v2: &Vec2) -> f64 {
    let dd = v1.norm() * v2.norm();
    if dd == 0.0 {
        return 1.0;
    }
    (v1.cross(v2) / dd).clamp(-1.0, 1.0)
}

/// Signed angle difference a2 - a1, normalized into (-π, π].
pub fn angle_dif(a1: f64, a2: f64) -> f64 {
    (a2 - a1 + PI).rem_euclid(2.0 * PI) - PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn norm_is_hypot() {
        assert_relative_eq!(Vec2::new(3.0, 4.0).norm(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn normalized_zero_is_zero() {
        let n = Vec2::ZERO.normalized();
        assert_relative_eq!(n.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn normalized_has_unit_norm() {
        let n = Vec2::new(-2.0, 7.0).normalized();
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn cross_of_basis_vectors() {
        let x = Vec2::new(1.0, 0.0);
        let y = Vec2::new(0.0, 1.0);
        assert_relative_eq!(x.cross(&y), 1.0, epsilon = 1e-12);
        assert_relative_eq!(y.cross(&x), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn rotated_quarter_turn() {
        let v = Vec2::new(1.0, 0.0).rotated(FRAC_PI_2);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn perp_is_clockwise_normal() {
        let v = Vec2::new(1.0, 2.0);
        let p = v.perp();
        assert_relative_eq!(v.dot(&p), 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.cross(&p), -v.norm() * v.norm(), epsilon = 1e-12);
    }

    #[test]
    fn cos_between_orthogonal_is_zero() {
        let c = cos_between(&Vec2::new(1.0, 0.0), &Vec2::new(0.0, 3.0));
        assert_relative_eq!(c, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn cos_between_zero_vector_is_one() {
        assert_relative_eq!(
            cos_between(&Vec2::ZERO, &Vec2::new(1.0, 1.0)),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn sin_between_sign_follows_orientation() {
        let s = sin_between(&Vec2::new(1.0, 0.0), &Vec2::new(0.0, 1.0));
        assert_relative_eq!(s, 1.0, epsilon = 1e-12);
        let s = sin_between(&Vec2::new(0.0, 1.0), &Vec2::new(1.0, 0.0));
        assert_relative_eq!(s, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn angle_dif_wraps_past_pi() {
        assert_relative_eq!(angle_dif(3.0, -3.0), 2.0 * PI - 6.0, epsilon = 1e-12);
        assert_relative_eq!(angle_dif(0.1, 0.3), 0.2, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn angle_dif_stays_in_half_open_interval(a1 in -10.0..10.0f64, a2 in -10.0..10.0f64) {
            let d = angle_dif(a1, a2);
            prop_assert!(d > -PI - 1e-12 && d <= PI + 1e-12);
        }

        #[test]
        fn rotation_preserves_norm(x in -100.0..100.0f64, y in -100.0..100.0f64, phi in -10.0..10.0f64) {
            let v = Vec2::new(x, y);
            prop_assert!((v.rotated(phi).norm() - v.norm()).abs() < 1e-9 * (1.0 + v.norm()));
        }

        #[test]
        fn cos_sin_between_form_unit_pair(x in -5.0..5.0f64, y in -5.0..5.0f64) {
            prop_assume!(x.hypot(y) > 1e-6);
            let u = Vec2::new(1.0, 0.3);
            let v = Vec2::new(x, y);
            let c = cos_between(&u, &v);
            let s = sin_between(&u, &v);
            prop_assert!((c * c + s * s - 1.0).abs() < 1e-9);
        }
    }
}
