//! Brent root bracketing.
//!
//! The tracer uses this for three jobs: locating a direction-field corner,
//! clipping a line at a stop function, and finding where a line crosses the
//! image bounds. All three calls use xtol = 1e-6 and a bounded iteration
//! count, so a single root solve can never hang a trace.

use crate::error::{CoreError, CoreResult};

/// Find a root of `f` in `[a, b]` with Brent's method (inverse quadratic
/// interpolation, secant and bisection fallback).
///
/// `f(a)` and `f(b)` must have opposite signs, otherwise
/// [`CoreError::NotBracketed`] is returned. Stops when the bracket shrinks
/// below `2·eps·|b| + xtol/2` and returns the best endpoint.
pub fn brent<F>(f: F, a: f64, b: f64, xtol: f64, maxiter: usize) -> CoreResult<f64>
where
    F: Fn(f64) -> f64,
{
    let mut a = a;
    let mut b = b;
    let mut fa = f(a);
    let mut fb = f(b);

    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }
    if fa.signum() == fb.signum() {
        return Err(CoreError::NotBracketed { a, b });
    }

    let mut c = a;
    let mut fc = fa;
    let mut d = b - a;
    let mut e = d;

    for _ in 0..maxiter {
        if fb.abs() > fc.abs() {
            // keep b the best approximation
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol1 = 2.0 * f64::EPSILON * b.abs() + 0.5 * xtol;
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol1 || fb == 0.0 {
            return Ok(b);
        }

        if e.abs() >= tol1 && fa.abs() > fb.abs() {
            // attempt inverse quadratic interpolation
            let s = fb / fa;
            let (mut p, mut q);
            if a == c {
                p = 2.0 * xm * s;
                q = 1.0 - s;
            } else {
                let qq = fa / fc;
                let r = fb / fc;
                p = s * (2.0 * xm * qq * (qq - r) - (b - a) * (r - 1.0));
                q = (qq - 1.0) * (r - 1.0) * (s - 1.0);
            }
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            let min1 = 3.0 * xm * q - (tol1 * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                // accept interpolation
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        if d.abs() > tol1 {
            b += d;
        } else {
            b += tol1.copysign(xm);
        }
        fb = f(b);

        if (fb > 0.0) == (fc > 0.0) {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
    }

    Err(CoreError::ConvergenceFailed { iterations: maxiter })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn finds_sqrt_two() {
        let r = brent(|x| x * x - 2.0, 0.0, 2.0, 1e-12, 100).unwrap();
        assert_abs_diff_eq!(r, 2.0f64.sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn finds_cosine_zero() {
        let r = brent(|x| x.cos(), 1.0, 2.0, 1e-12, 100).unwrap();
        assert_abs_diff_eq!(r, std::f64::consts::FRAC_PI_2, epsilon = 1e-10);
    }

    #[test]
    fn exact_endpoint_root() {
        let r = brent(|x| x, 0.0, 1.0, 1e-12, 100).unwrap();
        assert_abs_diff_eq!(r, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn unbracketed_is_error() {
        let e = brent(|x| x * x + 1.0, -1.0, 1.0, 1e-12, 100);
        assert!(matches!(e, Err(CoreError::NotBracketed { .. })));
    }

    #[test]
    fn steep_function_converges() {
        let r = brent(|x| (x - 0.123_456).tanh() * 1e6, 0.0, 1.0, 1e-9, 100).unwrap();
        assert_abs_diff_eq!(r, 0.123_456, epsilon = 1e-7);
    }

    #[test]
    fn respects_iteration_budget() {
        let e = brent(|x| x - 0.5, 0.0, 1.0, 1e-12, 1);
        assert!(matches!(
            e,
            Err(CoreError::ConvergenceFailed { .. }) | Ok(_)
        ));
    }
}
