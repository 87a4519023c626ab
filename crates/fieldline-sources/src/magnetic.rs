//! Closed-form fields of the current-carrying source kinds.
//!
//! Ring current and coil assemble their fields from the Bulirsch integral;
//! the formulas follow doi:10.2172/1377379 (thick loops) and
//! doi:10.1119/1.3256157 (finite solenoid). None of these kinds defines a
//! scalar potential on the whole plane (the magnetic scalar potential is
//! multivalued around a current), so only F is provided.

use fieldline_core::elliptic::cel;
use fieldline_core::Vec2;
use std::f64::consts::PI;

pub fn wire_field(p: Vec2, x: f64, y: f64, i: f64) -> Vec2 {
    let r = p - Vec2::new(x, y);
    let rr = r.dot(&r);
    if rr == 0.0 {
        return Vec2::ZERO;
    }
    let pre = i / (2.0 * PI * rr);
    Vec2::new(-r.y * pre, r.x * pre)
}

/// Infinitely long thin sheet carrying a current out of the image plane.
pub fn sheet_current_field(p: Vec2, x0: f64, y0: f64, x1: f64, y1: f64, i: f64) -> Vec2 {
    let m = Vec2::new(0.5 * (x0 + x1), 0.5 * (y0 + y1));
    let half = Vec2::new(x1 - m.x, y1 - m.y);
    let l = half.norm();
    let r_hat = half * (1.0 / l);
    let z_hat = r_hat.perp();
    let rel = (p - m) * (1.0 / l);
    let r = rel.dot(&r_hat);
    let z = rel.dot(&z_hat);

    let rp = 1.0 + r;
    let rm = 1.0 - r;

    let fr = if z == 0.0 {
        0.0
    } else {
        -0.5 * ((rp / z).atan() + (rm / z).atan())
    };
    // floors keep the edge logarithms finite
    let fz = ((z * z + rp * rp).max(1e-300).ln() - (z * z + rm * rm).max(1e-300).ln()) / 4.0;

    (r_hat * fr + z_hat * fz) * (i / (2.0 * PI * l))
}

/// Circular current loop perpendicular to the image plane.
pub fn ring_current_field(p: Vec2, x: f64, y: f64, phi: f64, radius: f64, i: f64) -> Vec2 {
    let r = p - Vec2::new(x, y);
    // cylindrical frame aligned with the ring axis
    let z_hat = Vec2::new(phi.cos(), phi.sin());
    let mut rho_hat = z_hat.perp();
    let z = r.dot(&z_hat);
    let mut rho = r.dot(&rho_hat);
    if rho < 0.0 {
        rho_hat = -rho_hat;
        rho = -rho;
    }

    let rp = (radius + rho).hypot(z);
    let rm = (radius - rho).hypot(z);

    let kc = (rm / rp).max(1e-16);
    let pre = i * radius / (PI * rp.powi(3));

    let f_z = cel(kc, kc * kc, radius + rho, radius - rho) * pre;
    let f_rho = cel(kc, kc * kc, -1.0, 1.0) * pre * z;

    rho_hat * f_rho + z_hat * f_z
}

/// Dense cylindrical coil (equivalently a cylinder magnet).
pub fn coil_field(p: Vec2, x: f64, y: f64, phi: f64, radius: f64, lhalf: f64, i: f64) -> Vec2 {
    let r = p - Vec2::new(x, y);
    let z_hat = Vec2::new(phi.cos(), phi.sin());
    let mut rho_hat = z_hat.perp();
    let z = r.dot(&z_hat);
    let mut rho = r.dot(&rho_hat);
    if rho < 0.0 {
        rho_hat = -rho_hat;
        rho = -rho;
    }

    let rp = radius + rho;
    let rm = radius - rho;
    let zp = z + lhalf;
    let zm = z - lhalf;
    let rpzp = rp.hypot(zp);
    let rpzm = rp.hypot(zm);
    let rmzp = rm.hypot(zp);
    let rmzm = rm.hypot(zm);
    let g = rm / rp;

    // limit proximity to the coil edges to available precision
    let kp = (rmzp / rpzp).max(1e-16);
    let km = (rmzm / rpzm).max(1e-16);

    let pre = i * radius / (2.0 * PI * lhalf);

    let f_zp = cel(kp, g * g, 1.0, g) * zp / rpzp;
    let f_zm = cel(km, g * g, 1.0, g) * zm / rpzm;
    let f_z = pre / rp * (f_zp - f_zm);

    let f_rhop = cel(kp, 1.0, 1.0, -1.0) / rpzp;
    let f_rhom = cel(km, 1.0, 1.0, -1.0) / rpzm;
    let f_rho = pre * (f_rhop - f_rhom);

    rho_hat * f_rho + z_hat * f_z
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn wire_field_is_azimuthal() {
        let f = wire_field(Vec2::new(1.0, 0.0), 0.0, 0.0, 1.0);
        assert_abs_diff_eq!(f.x, 0.0, epsilon = 1e-15);
        assert_relative_eq!(f.y, 1.0 / (2.0 * PI), max_relative = 1e-12);
    }

    #[test]
    fn wire_center_is_zero() {
        assert_eq!(wire_field(Vec2::ZERO, 0.0, 0.0, 3.0), Vec2::ZERO);
    }

    #[test]
    fn wire_decays_inverse_first_power() {
        let f1 = wire_field(Vec2::new(0.0, 1.0), 0.0, 0.0, 1.0).norm();
        let f3 = wire_field(Vec2::new(0.0, 3.0), 0.0, 0.0, 1.0).norm();
        assert_relative_eq!(f1 / f3, 3.0, max_relative = 1e-12);
    }

    #[test]
    fn sheet_current_reference_point() {
        let f = sheet_current_field(Vec2::new(0.7, -0.4), -1.0, 0.0, 1.0, 0.5, 2.0);
        assert_relative_eq!(f.x, -0.226_021_507_086_722_4, max_relative = 1e-12);
        assert_relative_eq!(f.y, -0.153_629_848_405_719_42, max_relative = 1e-12);
    }

    #[test]
    fn sheet_current_is_rotated_charged_plane() {
        // H of a sheet current is the E of the same sheet charged, turned
        // by 90 degrees
        let e = crate::electric::charged_plane_field(Vec2::new(0.3, 0.6), -1.0, 0.0, 1.0, 0.0, 2.0);
        let h = sheet_current_field(Vec2::new(0.3, 0.6), -1.0, 0.0, 1.0, 0.0, 2.0);
        assert_relative_eq!(h.x, e.y, max_relative = 1e-9);
        assert_relative_eq!(h.y, -e.x, max_relative = 1e-9);
    }

    #[test]
    fn ring_current_reference_point() {
        let f = ring_current_field(Vec2::new(0.7, -0.4), 0.0, 0.0, 0.3, 1.2, 2.0);
        assert_relative_eq!(f.x, 0.655_619_824_334_573_4, max_relative = 1e-9);
        assert_relative_eq!(f.y, -0.022_401_840_104_697_757, max_relative = 1e-7);
    }

    #[test]
    fn ring_current_on_axis_matches_loop_formula() {
        // H_z = I R² / (2 (R² + z²)^{3/2}) on the symmetry axis
        let (radius, i, zax, phi): (f64, f64, f64, f64) = (1.2, 2.0, 0.8, 0.3);
        let p = Vec2::new(zax * phi.cos(), zax * phi.sin());
        let f = ring_current_field(p, 0.0, 0.0, phi, radius, i);
        let expected = i * radius * radius / (2.0 * (radius * radius + zax * zax).powf(1.5));
        assert_relative_eq!(f.norm(), expected, max_relative = 1e-9);
        // field is along the axis
        assert_relative_eq!(f.x, expected * phi.cos(), max_relative = 1e-9);
        assert_relative_eq!(f.y, expected * phi.sin(), max_relative = 1e-9);
    }

    #[test]
    fn coil_reference_point() {
        let f = coil_field(Vec2::new(0.7, -0.4), 0.0, 0.0, 0.3, 1.2, 0.9, 2.0);
        assert_relative_eq!(f.x, 0.624_152_906_848_562_1, max_relative = 1e-9);
        assert_relative_eq!(f.y, 0.094_794_240_435_997_95, max_relative = 1e-8);
    }

    #[test]
    fn long_coil_center_approaches_solenoid_limit() {
        // deep inside a long solenoid H → I / (2·lhalf)
        let (radius, lhalf, i) = (0.2, 50.0, 3.0);
        let f = coil_field(Vec2::ZERO, 0.0, 0.0, 0.0, radius, lhalf, i);
        assert_relative_eq!(f.x, i / (2.0 * lhalf), max_relative = 1e-3);
        assert_abs_diff_eq!(f.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn coil_field_symmetric_under_rho_flip() {
        let up = coil_field(Vec2::new(0.3, 0.5), 0.0, 0.0, 0.0, 1.0, 0.5, 1.0);
        let dn = coil_field(Vec2::new(0.3, -0.5), 0.0, 0.0, 0.0, 1.0, 0.5, 1.0);
        assert_relative_eq!(up.x, dn.x, max_relative = 1e-10);
        assert_relative_eq!(up.y, -dn.y, max_relative = 1e-10);
    }
}
