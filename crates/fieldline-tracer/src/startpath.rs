//! Flux-proportional seed placement along a start curve.
//!
//! Sampling the flux rate |F × γ'| along a parametric curve and inverting
//! its cumulative integral places field-line seeds so that line density in
//! the finished drawing is proportional to the local field strength.

use crate::TraceError;
use fieldline_core::spline::CubicSpline;
use fieldline_core::Vec2;
use fieldline_sources::Field;

/// Cap on the field magnitude entering the flux rate, so a curve passing
/// near a singularity does not soak up all the seeds.
const DEFAULT_FMAX: f64 = 1e4;

/// A parametric curve seeds are placed on, reparameterized by flux.
pub struct Startpath {
    curve: Box<dyn Fn(f64) -> Vec2 + Send + Sync>,
    /// Maps a flux fraction in [0, 1] to a curve parameter.
    spline: CubicSpline,
}

impl Startpath {
    /// Build a start path over `curve` on [t0, t1] with the default field
    /// cap and no rescaling.
    pub fn new(
        field: &Field,
        curve: impl Fn(f64) -> Vec2 + Send + Sync + 'static,
        t0: f64,
        t1: f64,
    ) -> Result<Self, TraceError> {
        Self::with_limits(field, curve, t0, t1, DEFAULT_FMAX, None)
    }

    /// Build a start path with an explicit field cap and an optional
    /// magnitude rescaling (|F| → effective magnitude).
    pub fn with_limits(
        field: &Field,
        curve: impl Fn(f64) -> Vec2 + Send + Sync + 'static,
        t0: f64,
        t1: f64,
        fmax: f64,
        f_rescale: Option<Box<dyn Fn(f64) -> f64>>,
    ) -> Result<Self, TraceError> {
        if !(t1 > t0) {
            return Err(TraceError::InvalidParameter {
                name: "t1".into(),
                reason: format!("interval [{t0}, {t1}] is empty"),
            });
        }
        let trange = t1 - t0;

        // flux rate µ(t) = |F(γ(t)) × γ'(t)| with F clipped to fmax
        let flux_rate = |t: f64| -> f64 {
            let mut fv = field.f(curve(t));
            if let Some(rescale) = &f_rescale {
                let fabs = fv.norm();
                if fabs > 0.0 {
                    fv = fv * (rescale(fabs) / fabs);
                }
            }
            let fabs = fv.norm();
            if fabs > fmax {
                fv = fv * (fmax / fabs);
            }
            let dt = trange * 1e-6;
            let tm = (t - dt).clamp(t0, t1);
            let tp = (t + dt).clamp(t0, t1);
            let dpath = (curve(tp) - curve(tm)) * (1.0 / (tp - tm));
            fv.cross(&dpath).abs()
        };

        let mut tlist: Vec<f64> = (0..201).map(|i| t0 + trange * i as f64 / 200.0).collect();
        let mut flist: Vec<f64> = tlist.iter().map(|&t| flux_rate(t)).collect();
        let pathlen: f64 = tlist
            .windows(2)
            .map(|w| (curve(w[1]) - curve(w[0])).norm())
            .sum();
        let f_seen = flist.iter().fold(0.0f64, |a, &b| a.max(b));

        // refine support points where the flux rate or the geometry
        // changes quickly
        let mut i = 1;
        while i < tlist.len() {
            let tdif_too_small = (tlist[i] - tlist[i - 1]) < 1e-6 * trange;
            let fdif_is_large = (flist[i] - flist[i - 1]).abs() > 0.01 * f_seen;
            let dist_is_large = (curve(tlist[i]) - curve(tlist[i - 1])).norm() > 1e-3 * pathlen;
            if !tdif_too_small && (fdif_is_large || dist_is_large) {
                let tmean = 0.5 * (tlist[i - 1] + tlist[i]);
                tlist.insert(i, tmean);
                flist.insert(i, flux_rate(tmean));
            } else {
                i += 1;
            }
        }

        // cumulative flux by the trapezoidal rule
        let mut cum = vec![0.0f64];
        for i in 1..tlist.len() {
            let step = (tlist[i] - tlist[i - 1]) * (flist[i - 1] + flist[i]) / 2.0;
            cum.push(cum[i - 1] + step);
        }
        let total = cum[cum.len() - 1];
        if !total.is_finite() || total <= 0.0 {
            return Err(TraceError::InvalidParameter {
                name: "field".into(),
                reason: "no flux crosses the start path".into(),
            });
        }

        // spline knots at the normalized flux; a zero-flux stretch of the
        // curve collapses to its first sample
        let mut xs: Vec<f64> = Vec::with_capacity(cum.len());
        let mut ys: Vec<f64> = Vec::with_capacity(cum.len());
        for (i, &c) in cum.iter().enumerate() {
            let x = c / total;
            if xs.last().is_none_or(|&last| x > last) {
                xs.push(x);
                ys.push(tlist[i]);
            }
        }
        let spline = CubicSpline::fit(&xs, &ys)?;

        Ok(Self {
            curve: Box::new(curve),
            spline,
        })
    }

    /// The position where a fraction `s` of the total flux along the path
    /// is covered.
    pub fn startpos(&self, s: f64) -> Vec2 {
        (self.curve)(self.spline.eval(s))
    }

    /// `n` seed positions with equal flux between neighbors.
    pub fn npoints(&self, n: usize) -> Vec<Vec2> {
        (0..n)
            .map(|i| self.startpos((i as f64 + 0.5) / n as f64))
            .collect()
    }
}
