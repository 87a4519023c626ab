//! Closed-form fields and potentials of the electric source kinds.
//!
//! Every function is pure: it maps an observation point plus the element
//! parameters to a field vector or a potential value. Singular points
//! return zero, with one deliberate exception: a dipole evaluated at its
//! own position returns its moment (px, py) with an unphysical sign, which
//! lets the line integrator step straight through the singularity instead
//! of turning around on it.

use fieldline_core::elliptic::cel;
use fieldline_core::quadrature::adaptive_simpson;
use fieldline_core::Vec2;
use std::f64::consts::PI;

/// Clamp bound for atanh arguments at charged-plane and rect edges.
/// The edge of the sheet is a true singularity of Fr; clamping keeps the
/// contribution finite and continuous instead of dropping the element.
const ATANH_CLAMP: f64 = 1.0 - 1e-16;

/// Local in-plane frame of a segment (x0,y0)-(x1,y1): returns
/// (half-length l, unit vector along the segment, observation point in
/// units of l relative to the midpoint).
fn segment_frame(p: Vec2, x0: f64, y0: f64, x1: f64, y1: f64) -> (f64, Vec2, Vec2) {
    let m = Vec2::new(0.5 * (x0 + x1), 0.5 * (y0 + y1));
    let half = Vec2::new(x1 - m.x, y1 - m.y);
    let l = half.norm();
    let axis = half * (1.0 / l);
    let rel = (p - m) * (1.0 / l);
    (l, axis, rel)
}

pub fn monopole_field(p: Vec2, x: f64, y: f64, q: f64) -> Vec2 {
    let r = p - Vec2::new(x, y);
    let d = r.norm();
    if d == 0.0 {
        return Vec2::ZERO;
    }
    r * (q / (4.0 * PI * d * d * d))
}

pub fn monopole_potential(p: Vec2, x: f64, y: f64, q: f64) -> f64 {
    let d = (p - Vec2::new(x, y)).norm().max(1e-16);
    q / (4.0 * PI * d)
}

pub fn dipole_field(p: Vec2, x: f64, y: f64, px: f64, py: f64) -> Vec2 {
    let r = p - Vec2::new(x, y);
    let d = r.norm();
    if d == 0.0 {
        // unphysical sign allows the line to pass through
        return Vec2::new(px, py);
    }
    let rp = r.x * px + r.y * py;
    let pre = 0.25 / (PI * d.powi(5));
    Vec2::new(
        pre * (3.0 * rp * r.x - d * d * px),
        pre * (3.0 * rp * r.y - d * d * py),
    )
}

pub fn dipole_potential(p: Vec2, x: f64, y: f64, px: f64, py: f64) -> f64 {
    let r = p - Vec2::new(x, y);
    let d = r.norm();
    if d == 0.0 {
        return 0.0;
    }
    (r.x * px + r.y * py) / (4.0 * PI * d * d * d)
}

pub fn dipole2d_field(p: Vec2, x: f64, y: f64, px: f64, py: f64) -> Vec2 {
    let r = p - Vec2::new(x, y);
    let rr = r.dot(&r);
    if rr == 0.0 {
        // unphysical sign allows the line to pass through
        return Vec2::new(px, py);
    }
    let rp = r.x * px + r.y * py;
    let pre = 0.5 / (PI * rr * rr);
    Vec2::new(
        pre * (2.0 * rp * r.x - rr * px),
        pre * (2.0 * rp * r.y - rr * py),
    )
}

pub fn dipole2d_potential(p: Vec2, x: f64, y: f64, px: f64, py: f64) -> f64 {
    let r = p - Vec2::new(x, y);
    let rr = r.dot(&r);
    if rr == 0.0 {
        return 0.0;
    }
    (r.x * px + r.y * py) / (2.0 * PI * rr)
}

pub fn quadrupole_field(p: Vec2, x: f64, y: f64, qxx: f64, qxy: f64, qyy: f64) -> Vec2 {
    let r = p - Vec2::new(x, y);
    let d = r.norm();
    if d == 0.0 {
        return Vec2::ZERO;
    }
    let qr = Vec2::new(qxx * r.x + qxy * r.y, qxy * r.x + qyy * r.y);
    let rqr = r.dot(&qr);
    let pre = 0.25 / (PI * d.powi(7));
    Vec2::new(
        pre * (2.5 * rqr * r.x - d * d * qr.x),
        pre * (2.5 * rqr * r.y - d * d * qr.y),
    )
}

pub fn quadrupole_potential(p: Vec2, x: f64, y: f64, qxx: f64, qxy: f64, qyy: f64) -> f64 {
    let r = p - Vec2::new(x, y);
    let d = r.norm();
    if d == 0.0 {
        return 0.0;
    }
    let rqr = qxx * r.x * r.x + 2.0 * qxy * r.x * r.y + qyy * r.y * r.y;
    rqr / (8.0 * PI * d.powi(5))
}

pub fn charged_wire_field(p: Vec2, x: f64, y: f64, q: f64) -> Vec2 {
    let r = p - Vec2::new(x, y);
    let rr = r.dot(&r);
    if rr == 0.0 {
        return Vec2::ZERO;
    }
    r * (q / (2.0 * PI * rr))
}

pub fn charged_wire_potential(p: Vec2, x: f64, y: f64, q: f64) -> f64 {
    let d = (p - Vec2::new(x, y)).norm();
    -q * d.max(1e-18).ln() / (2.0 * PI)
}

/// Finite charged line segment inside the image plane.
pub fn charged_line_field(p: Vec2, x0: f64, y0: f64, x1: f64, y1: f64, q: f64) -> Vec2 {
    let (l, z_hat, rel) = segment_frame(p, x0, y0, x1, y1);
    // z along the segment (half-length 1), r across it
    let r_hat = z_hat.perp();
    let z = rel.dot(&z_hat);
    let r = rel.dot(&r_hat);

    let dp = r.hypot(z + 1.0).max(1e-16);
    let dm = r.hypot(z - 1.0).max(1e-16);

    let fr = if r == 0.0 {
        // discontinuity along the line must be 0 for reasons of symmetry
        0.0
    } else {
        ((z + 1.0) / dp - (z - 1.0) / dm) / (2.0 * r)
    };
    let fz = 0.5 / dm - 0.5 / dp;

    (r_hat * fr + z_hat * fz) * (q / (4.0 * PI * l * l))
}

pub fn charged_line_potential(p: Vec2, x0: f64, y0: f64, x1: f64, y1: f64, q: f64) -> f64 {
    let (l, z_hat, rel) = segment_frame(p, x0, y0, x1, y1);
    let r_hat = z_hat.perp();
    let r = rel.dot(&r_hat);
    let z = rel.dot(&z_hat).abs();

    let dp = z + 1.0 + (z + 1.0).hypot(r);
    // cancellation-safe form of z - 1 + hypot(z - 1, r) for z < 1
    let dm = if z >= 1.0 {
        z - 1.0 + (z - 1.0).hypot(r)
    } else {
        r * r / (1.0 - z + (1.0 - z).hypot(r))
    };
    let dm = dm.max(1e-32);

    q / (8.0 * PI * l) * (dp / dm).ln()
}

/// Charged plane through the segment, infinite in z.
pub fn charged_plane_field(p: Vec2, x0: f64, y0: f64, x1: f64, y1: f64, q: f64) -> Vec2 {
    let (l, r_hat, rel) = segment_frame(p, x0, y0, x1, y1);
    // r along the plane, z across it
    let z_hat = r_hat.perp();
    let r = rel.dot(&r_hat);
    let z = rel.dot(&z_hat);

    let fz = if z == 0.0 {
        // discontinuity along the plane must be 0 for reasons of symmetry
        0.0
    } else {
        0.5 * (((1.0 + r) / z).atan() + ((1.0 - r) / z).atan())
    };

    let arg = (2.0 * r / (1.0 + r * r + z * z)).clamp(-ATANH_CLAMP, ATANH_CLAMP);
    let fr = 0.5 * arg.atanh();

    (r_hat * fr + z_hat * fz) * (q / (2.0 * PI * l))
}

pub fn charged_plane_potential(p: Vec2, x0: f64, y0: f64, x1: f64, y1: f64, q: f64) -> f64 {
    let (l, r_hat, rel) = segment_frame(p, x0, y0, x1, y1);
    let z_hat = r_hat.perp();
    let r = rel.dot(&r_hat).abs();
    let z = rel.dot(&z_hat).abs();

    let rp = r + 1.0;
    let rm = r - 1.0;
    let dp2 = rp * rp + z * z;
    let dm2 = rm * rm + z * z;

    let mut v = 1.0;
    if dm2 != 0.0 {
        v += 0.25 * rm * dm2.ln();
    }
    v -= 0.25 * rp * dp2.ln();
    if z != 0.0 {
        v += 0.5 * z * ((rm / z).atan() - (rp / z).atan());
    }

    q / (2.0 * PI) * (v - l.ln())
}

/// Charged rectangle: the plane cut off at |z| = lz/2.
pub fn charged_rect_field(p: Vec2, x0: f64, y0: f64, x1: f64, y1: f64, lz: f64, q: f64) -> Vec2 {
    let (l, r_hat, rel) = segment_frame(p, x0, y0, x1, y1);
    let a = 0.5 * lz / l;
    let z_hat = r_hat.perp();
    let r = rel.dot(&r_hat);
    let z = rel.dot(&z_hat);

    let rp = 1.0 + r;
    let rm = 1.0 - r;
    let hp = (a * a + z * z + rp * rp).sqrt();
    let hm = (a * a + z * z + rm * rm).sqrt();

    let fz = if z == 0.0 {
        0.0
    } else {
        ((a * rp / (z * hp)).atan() + (a * rm / (z * hm)).atan()) * 0.5 / a
    };

    let arg = (2.0 * r / (1.0 + r * r + z * z)).clamp(-ATANH_CLAMP, ATANH_CLAMP);
    let fr = (arg.atanh() + ((a + hm) / (a + hp)).ln()) * 0.5 / a;

    (r_hat * fr + z_hat * fz) * (q / (4.0 * PI * l * l))
}

pub fn charged_rect_potential(p: Vec2, x0: f64, y0: f64, x1: f64, y1: f64, lz: f64, q: f64) -> f64 {
    let (l, r_hat, rel) = segment_frame(p, x0, y0, x1, y1);
    let a = (0.5 * lz / l).abs();
    let z_hat = r_hat.perp();
    let r = rel.dot(&r_hat);
    let z = rel.dot(&z_hat);

    // the potential splits into two mirror terms at r ± 1
    let mut v = 0.0;
    for s in [-1.0, 1.0] {
        let x = r + s;
        let r2 = x.hypot(z);
        let r3 = r2.hypot(a);

        if r2 >= 1e-16 {
            v += s * (a * (x + r3).ln() + x * ((a + r3) / r2).ln());
        } else {
            v += s * a * r3.ln();
        }

        if z * r3 != 0.0 {
            v -= s * z * (a * x / (z * r3)).atan();
        }
    }

    q / (8.0 * PI * a * l) * v
}

/// Homogeneously charged disc with its symmetry axis in the image plane.
pub fn charged_disc_field(p: Vec2, x0: f64, y0: f64, x1: f64, y1: f64, q: f64) -> Vec2 {
    let radius = 0.5 * (x1 - x0).hypot(y1 - y0);
    let m = Vec2::new(0.5 * (x0 + x1), 0.5 * (y0 + y1));
    let r = p - m;
    // cylindrical frame: rho along the visible diameter, z along the axis
    let mut rho_hat = Vec2::new((x1 - m.x) / radius, (y1 - m.y) / radius);
    let mut z_hat = rho_hat.perp();
    let mut z = r.dot(&z_hat);
    let mut rho = r.dot(&rho_hat);
    if rho < 0.0 {
        rho_hat = -rho_hat;
        rho = -rho;
    }
    if z < 0.0 {
        z_hat = -z_hat;
        z = -z;
    }

    let rp = rho + radius;
    let rm = rho - radius;
    let rpz = rp.hypot(z);
    let rmz = rm.hypot(z);
    let g = rm / rp;
    let pre = q / (PI * radius).powi(2);

    // limit proximity to the disc edge to available precision
    let k = (rmz / rpz).max(1e-16);

    let f_rho = pre * cel(k, 1.0, -1.0, 1.0) * radius / rpz;

    let mut f_z = cel(k, g * g, -1.0, g) * z * radius / (rp * rpz);
    if g == 0.0 {
        f_z += PI / 4.0;
    } else if g < 0.0 {
        f_z += PI / 2.0;
    }
    f_z *= pre;

    rho_hat * f_rho + z_hat * f_z
}

pub fn charged_disc_potential(p: Vec2, x0: f64, y0: f64, x1: f64, y1: f64, q: f64) -> f64 {
    let radius = 0.5 * (x1 - x0).hypot(y1 - y0);
    let m = Vec2::new(0.5 * (x0 + x1), 0.5 * (y0 + y1));
    let rho_hat = Vec2::new((x1 - m.x) / radius, (y1 - m.y) / radius);
    let z_hat = rho_hat.perp();
    let rel = (p - m) * (1.0 / radius);
    let z = rel.dot(&z_hat);
    let rho = rel.dot(&rho_hat);

    let zrho1 = z * z + rho * rho + 1.0;
    // analytic integration along one disc coordinate leaves this numeric
    // integral over the other
    let integrand = |t: f64| {
        let st = t * (2.0 - t * t).sqrt();
        let s1 = (zrho1 - st * 2.0 * rho).sqrt() - rho + st;
        let s2 = (zrho1 + st * 2.0 * rho).sqrt() - rho - st;
        (s1 / s2).ln() * 2.0 * t
    };
    let v = adaptive_simpson(&integrand, 0.0, 1.0, 1e-9);

    q / (2.0 * PI * PI * radius) * v
}
