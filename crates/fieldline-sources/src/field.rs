//! The additive field aggregator.

use crate::electric::*;
use crate::element::Source;
use crate::magnetic::*;
use fieldline_core::Vec2;
use serde::{Deserialize, Serialize};

/// Step used to recover F from a custom potential by central differences.
const POTENTIAL_DIFF_STEP: f64 = 1e-6;

/// Errors produced when assembling a [`Field`].
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("element {index} ({kind}): {reason}")]
    InvalidElement {
        index: usize,
        kind: &'static str,
        reason: String,
    },
}

/// An isolated singular point of the field, as seen by the line tracer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pole {
    pub position: Vec2,
    pub kind: PoleKind,
}

/// What sits at a [`Pole`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PoleKind {
    Monopole,
    Dipole { moment: Vec2 },
}

/// A superposition of analytic source elements, immutable after creation.
///
/// `f` and `v` are pure functions of the observation point, so one field
/// can back any number of concurrent line tracers without locking.
#[derive(Debug, Clone, Default)]
pub struct Field {
    elements: Vec<Source>,
}

impl Field {
    /// Build a field from an ordered list of elements, validating their
    /// geometry.
    pub fn new(elements: Vec<Source>) -> Result<Self, FieldError> {
        for (index, el) in elements.iter().enumerate() {
            el.validate().map_err(|reason| FieldError::InvalidElement {
                index,
                kind: el.kind(),
                reason,
            })?;
        }
        Ok(Self { elements })
    }

    pub fn elements(&self) -> &[Source] {
        &self.elements
    }

    /// Total field vector at `p`.
    ///
    /// Magnetic sources contribute H, electric ones D, so no vacuum
    /// constants appear. An element whose contribution comes out
    /// non-finite (a numerical singularity) is skipped, so one ill-placed
    /// source never aborts a trace.
    pub fn f(&self, p: Vec2) -> Vec2 {
        let mut total = Vec2::ZERO;
        for el in &self.elements {
            let contrib = match *el {
                Source::Homogeneous { fx, fy } => Vec2::new(fx, fy),
                Source::Potential { .. } => Vec2::ZERO,
                Source::Monopole { x, y, q } => monopole_field(p, x, y, q),
                Source::Dipole { x, y, px, py } => dipole_field(p, x, y, px, py),
                Source::Dipole2d { x, y, px, py } => dipole2d_field(p, x, y, px, py),
                Source::Quadrupole { x, y, qxx, qxy, qyy } => {
                    quadrupole_field(p, x, y, qxx, qxy, qyy)
                }
                Source::Wire { x, y, i } => wire_field(p, x, y, i),
                Source::ChargedWire { x, y, q } => charged_wire_field(p, x, y, q),
                Source::ChargedLine { x0, y0, x1, y1, q } => {
                    charged_line_field(p, x0, y0, x1, y1, q)
                }
                Source::ChargedPlane { x0, y0, x1, y1, q } => {
                    charged_plane_field(p, x0, y0, x1, y1, q)
                }
                Source::ChargedRect { x0, y0, x1, y1, lz, q } => {
                    charged_rect_field(p, x0, y0, x1, y1, lz, q)
                }
                Source::ChargedDisc { x0, y0, x1, y1, q } => {
                    charged_disc_field(p, x0, y0, x1, y1, q)
                }
                Source::SheetCurrent { x0, y0, x1, y1, i } => {
                    sheet_current_field(p, x0, y0, x1, y1, i)
                }
                Source::RingCurrent { x, y, phi, r, i } => ring_current_field(p, x, y, phi, r, i),
                Source::Coil { x, y, phi, r, lhalf, i } => coil_field(p, x, y, phi, r, lhalf, i),
                Source::Custom(ref c) => {
                    if let Some(field) = &c.field {
                        field(p)
                    } else if let Some(pot) = &c.potential {
                        // recover the field from the potential numerically
                        let d = POTENTIAL_DIFF_STEP;
                        Vec2::new(
                            (pot(p - Vec2::new(d, 0.0)) - pot(p + Vec2::new(d, 0.0))) / (2.0 * d),
                            (pot(p - Vec2::new(0.0, d)) - pot(p + Vec2::new(0.0, d))) / (2.0 * d),
                        )
                    } else {
                        Vec2::ZERO
                    }
                }
            };
            if contrib.is_finite() {
                total = total + contrib;
            } else {
                tracing::debug!(kind = el.kind(), x = p.x, y = p.y, "non-finite field contribution skipped");
            }
        }
        total
    }

    /// Normalized field direction at `p`, or zero where the field vanishes.
    pub fn direction(&self, p: Vec2) -> Vec2 {
        self.f(p).normalized()
    }

    /// Total scalar potential at `p`.
    ///
    /// For electric sources E = -grad(V); for magnetic ones this is the
    /// scalar potential of H. Kinds without a potential contribute nothing.
    pub fn v(&self, p: Vec2) -> f64 {
        let mut total = 0.0;
        for el in &self.elements {
            let contrib = match *el {
                Source::Potential { v } => v,
                Source::Homogeneous { fx, fy } => -p.x * fx - p.y * fy,
                Source::Monopole { x, y, q } => monopole_potential(p, x, y, q),
                Source::Dipole { x, y, px, py } => dipole_potential(p, x, y, px, py),
                Source::Dipole2d { x, y, px, py } => dipole2d_potential(p, x, y, px, py),
                Source::Quadrupole { x, y, qxx, qxy, qyy } => {
                    quadrupole_potential(p, x, y, qxx, qxy, qyy)
                }
                Source::ChargedWire { x, y, q } => charged_wire_potential(p, x, y, q),
                Source::ChargedLine { x0, y0, x1, y1, q } => {
                    charged_line_potential(p, x0, y0, x1, y1, q)
                }
                Source::ChargedPlane { x0, y0, x1, y1, q } => {
                    charged_plane_potential(p, x0, y0, x1, y1, q)
                }
                Source::ChargedRect { x0, y0, x1, y1, lz, q } => {
                    charged_rect_potential(p, x0, y0, x1, y1, lz, q)
                }
                Source::ChargedDisc { x0, y0, x1, y1, q } => {
                    charged_disc_potential(p, x0, y0, x1, y1, q)
                }
                Source::Custom(ref c) => match &c.potential {
                    Some(pot) => pot(p),
                    None => {
                        tracing::debug!(kind = "custom", "no potential callback");
                        0.0
                    }
                },
                Source::Wire { .. }
                | Source::SheetCurrent { .. }
                | Source::RingCurrent { .. }
                | Source::Coil { .. } => {
                    tracing::debug!(kind = el.kind(), "potential not defined for this kind");
                    0.0
                }
            };
            if contrib.is_finite() {
                total += contrib;
            } else {
                tracing::debug!(kind = el.kind(), x = p.x, y = p.y, "non-finite potential contribution skipped");
            }
        }
        total
    }

    /// The singular points the line tracer must treat specially.
    pub fn poles(&self) -> Vec<Pole> {
        self.elements
            .iter()
            .filter_map(|el| match *el {
                Source::Monopole { x, y, .. } => Some(Pole {
                    position: Vec2::new(x, y),
                    kind: PoleKind::Monopole,
                }),
                Source::Dipole { x, y, px, py } | Source::Dipole2d { x, y, px, py } => Some(Pole {
                    position: Vec2::new(x, y),
                    kind: PoleKind::Dipole {
                        moment: Vec2::new(px, py),
                    },
                }),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::CustomSource;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use proptest::prelude::*;

    fn monopole(x: f64, y: f64, q: f64) -> Source {
        Source::Monopole { x, y, q }
    }

    #[test]
    fn empty_field_is_zero_everywhere() {
        let field = Field::new(vec![]).unwrap();
        assert_eq!(field.f(Vec2::new(1.0, 2.0)), Vec2::ZERO);
        assert_eq!(field.v(Vec2::new(1.0, 2.0)), 0.0);
    }

    #[test]
    fn direction_is_unit_or_zero() {
        let field = Field::new(vec![monopole(0.0, 0.0, 1.0)]).unwrap();
        assert_relative_eq!(
            field.direction(Vec2::new(0.3, -0.8)).norm(),
            1.0,
            epsilon = 1e-12
        );
        assert_eq!(field.direction(Vec2::ZERO), Vec2::ZERO);
    }

    #[test]
    fn invalid_element_is_rejected_with_index() {
        let err = Field::new(vec![
            monopole(0.0, 0.0, 1.0),
            Source::ChargedLine {
                x0: 0.0,
                y0: 0.0,
                x1: 0.0,
                y1: 0.0,
                q: 1.0,
            },
        ])
        .unwrap_err();
        let FieldError::InvalidElement { index, kind, .. } = err;
        assert_eq!(index, 1);
        assert_eq!(kind, "charged_line");
    }

    #[test]
    fn potential_offset_shifts_v_only() {
        let plain = Field::new(vec![monopole(0.0, 0.0, 1.0)]).unwrap();
        let offset = Field::new(vec![monopole(0.0, 0.0, 1.0), Source::Potential { v: 2.5 }]).unwrap();
        let p = Vec2::new(1.0, 1.0);
        assert_eq!(plain.f(p), offset.f(p));
        assert_relative_eq!(offset.v(p) - plain.v(p), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn custom_field_callback_is_used() {
        let field = Field::new(vec![Source::Custom(CustomSource::from_field(|p: Vec2| {
            Vec2::new(-p.y, p.x)
        }))])
        .unwrap();
        let f = field.f(Vec2::new(2.0, 0.0));
        assert_relative_eq!(f.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn custom_potential_yields_gradient_field() {
        // V = -x ⇒ F = (1, 0)
        let field =
            Field::new(vec![Source::Custom(CustomSource::from_potential(|p: Vec2| -p.x))]).unwrap();
        let f = field.f(Vec2::new(0.4, -1.2));
        assert_relative_eq!(f.x, 1.0, max_relative = 1e-6);
        assert_abs_diff_eq!(f.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn non_finite_custom_contribution_is_skipped() {
        let field = Field::new(vec![
            monopole(0.0, 0.0, 1.0),
            Source::Custom(CustomSource::from_field(|_| Vec2::new(f64::NAN, 0.0))),
        ])
        .unwrap();
        let f = field.f(Vec2::new(1.0, 0.0));
        assert!(f.is_finite());
        assert!(f.x > 0.0);
    }

    #[test]
    fn wire_contributes_no_potential() {
        let field = Field::new(vec![Source::Wire {
            x: 0.0,
            y: 0.0,
            i: 1.0,
        }])
        .unwrap();
        assert_eq!(field.v(Vec2::new(1.0, 1.0)), 0.0);
    }

    #[test]
    fn poles_cover_monopoles_and_dipoles() {
        let field = Field::new(vec![
            monopole(1.0, 0.0, 1.0),
            Source::Dipole {
                x: -1.0,
                y: 0.0,
                px: 0.0,
                py: 2.0,
            },
            Source::Wire {
                x: 0.0,
                y: 1.0,
                i: 1.0,
            },
        ])
        .unwrap();
        let poles = field.poles();
        assert_eq!(poles.len(), 2);
        assert_eq!(poles[0].kind, PoleKind::Monopole);
        assert!(matches!(poles[1].kind, PoleKind::Dipole { .. }));
    }

    proptest! {
        #[test]
        fn superposition_holds(x in -3.0..3.0f64, y in -3.0..3.0f64) {
            let p = Vec2::new(x, y);
            let a = monopole(0.5, 0.0, 1.0);
            let b = Source::Wire { x: -0.5, y: 0.0, i: 2.0 };
            let fa = Field::new(vec![a.clone()]).unwrap().f(p);
            let fb = Field::new(vec![b.clone()]).unwrap().f(p);
            let fab = Field::new(vec![a, b]).unwrap().f(p);
            prop_assert!((fab.x - fa.x - fb.x).abs() < 1e-12 * (1.0 + fab.x.abs()));
            prop_assert!((fab.y - fa.y - fb.y).abs() < 1e-12 * (1.0 + fab.y.abs()));
        }

        #[test]
        fn field_matches_negative_potential_gradient(x in -2.0..2.0f64, y in 0.3..2.0f64) {
            // stay a finite distance away from the charged line's plane
            let p = Vec2::new(x, y);
            let field = Field::new(vec![
                monopole(0.0, -0.5, 1.0),
                Source::ChargedLine { x0: -1.0, y0: -0.2, x1: 1.0, y1: -0.2, q: 1.5 },
            ]).unwrap();
            let eps = 1e-6;
            let gx = (field.v(p - Vec2::new(eps, 0.0)) - field.v(p + Vec2::new(eps, 0.0))) / (2.0 * eps);
            let gy = (field.v(p - Vec2::new(0.0, eps)) - field.v(p + Vec2::new(0.0, eps))) / (2.0 * eps);
            let f = field.f(p);
            prop_assert!((f.x - gx).abs() <= 1e-4 * (1.0 + f.x.abs()));
            prop_assert!((f.y - gy).abs() <= 1e-4 * (1.0 + f.y.abs()));
        }
    }
}
