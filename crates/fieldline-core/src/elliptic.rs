//! Bulirsch's complete elliptic integral cel(kc, p, a, b).
//!
//! Reference: R. Bulirsch, Numerical calculation of elliptic integrals and
//! elliptic functions III, Numer. Math. 13 (1969), doi:10.1007/BF02165405.
//! The general integral covers the complete integrals of first, second and
//! third kind; the ring-current, coil and charged-disc evaluators assemble
//! their fields from it.

use std::f64::consts::PI;

/// Relative iteration tolerance; the actual relative error is tol².
/// Part of the routine's contract together with the 11-round cap.
const TOL: f64 = 1e-9;

/// General complete elliptic integral in Bulirsch form.
///
/// cel(kc, p, a, b) = ∫₀^{π/2} (a·cos²φ + b·sin²φ)
///                    / ((cos²φ + p·sin²φ)·√(cos²φ + kc²·sin²φ)) dφ
///
/// Special values: cel(kc, 1, 1, 1) = K(k), cel(kc, 1, 1, kc²) = E(k)
/// with kc² = 1 - k². Returns NaN for kc = 0 where the integral diverges.
pub fn cel(kc: f64, p: f64, a: f64, b: f64) -> f64 {
    if kc == 0.0 {
        return f64::NAN;
    }

    let mut k = kc.abs();
    let mut kc = k;
    let mut m = 1.0;
    let mut p = p;
    let mut a = a;
    let mut b = b;

    if p > 0.0 {
        p = p.sqrt();
        b /= p;
    } else {
        let f = kc * kc;
        let g = 1.0 - p;
        let q = (1.0 - f) * (b - a * p);
        let fp = f - p;
        p = (fp / g).sqrt();
        a = (a - b) / g;
        b = a * p - q / (g * g * p);
    }

    let mut i = 0;
    loop {
        let f = a;
        a += b / p;
        let g = k / p;
        b = 2.0 * (b + f * g);
        p += g;
        let g = m;
        m += kc;

        if (g - kc).abs() <= g * TOL || i >= 10 {
            break;
        }

        i += 1;
        kc = 2.0 * k.sqrt();
        k = kc * m;
    }

    PI * 0.5 * (a * m + b) / (m * (m + p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn kc_zero_is_nan() {
        assert!(cel(0.0, 1.0, 1.0, 1.0).is_nan());
    }

    #[test]
    fn degenerate_circle_value() {
        // K(0) = E(0) = π/2
        assert_relative_eq!(cel(1.0, 1.0, 1.0, 1.0), PI / 2.0, max_relative = 1e-12);
    }

    #[test]
    fn first_kind_at_k_half() {
        // K(k=0.5), kc = sqrt(3)/2; reference value from Abramowitz & Stegun
        let kc = (0.75f64).sqrt();
        assert_relative_eq!(
            cel(kc, 1.0, 1.0, 1.0),
            1.685_750_354_812_596,
            max_relative = 1e-10
        );
    }

    #[test]
    fn second_kind_at_k_half() {
        // E(k=0.5)
        let kc = (0.75f64).sqrt();
        assert_relative_eq!(
            cel(kc, 1.0, 1.0, kc * kc),
            1.467_462_209_339_427,
            max_relative = 1e-10
        );
    }

    #[test]
    fn even_in_kc() {
        let v1 = cel(0.3, 1.0, 1.0, 1.0);
        let v2 = cel(-0.3, 1.0, 1.0, 1.0);
        assert_relative_eq!(v1, v2, max_relative = 1e-14);
    }

    #[test]
    fn third_kind_negative_p_is_finite() {
        // negative-p branch is exercised by the coil evaluator off-axis
        let v = cel(0.8, -0.5, 1.0, 1.0);
        assert!(v.is_finite());
    }

    #[test]
    fn near_singular_kc_still_converges() {
        // kc floored at 1e-16 by the field evaluators; must stay finite
        let v = cel(1e-16, 1.0, 1.0, 1.0);
        assert!(v.is_finite());
    }
}
