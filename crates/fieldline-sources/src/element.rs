//! The tagged union of field source kinds.

use fieldline_core::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// User-supplied field callback.
pub type FieldFn = Arc<dyn Fn(Vec2) -> Vec2 + Send + Sync>;
/// User-supplied potential callback.
pub type PotentialFn = Arc<dyn Fn(Vec2) -> f64 + Send + Sync>;

/// A user-defined source given as callbacks.
///
/// At least one of the two callbacks should be present; with only a
/// potential, the field is recovered by central finite differences.
#[derive(Clone, Default)]
pub struct CustomSource {
    pub field: Option<FieldFn>,
    pub potential: Option<PotentialFn>,
}

impl CustomSource {
    pub fn from_field(f: impl Fn(Vec2) -> Vec2 + Send + Sync + 'static) -> Self {
        Self {
            field: Some(Arc::new(f)),
            potential: None,
        }
    }

    pub fn from_potential(v: impl Fn(Vec2) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            field: None,
            potential: Some(Arc::new(v)),
        }
    }
}

impl fmt::Debug for CustomSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomSource")
            .field("field", &self.field.as_ref().map(|_| "Fn"))
            .field("potential", &self.potential.as_ref().map(|_| "Fn"))
            .finish()
    }
}

/// One source element of a field.
///
/// Geometry lives in image-plane units. "Perpendicular to the image plane"
/// kinds (charged wire, plane, sheet current) extend infinitely in z;
/// ring currents, coils and discs have their symmetry axis inside the
/// image plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    /// Uniform background field (Fx, Fy).
    Homogeneous { fx: f64, fy: f64 },
    /// Constant offset added to the scalar potential; no field.
    Potential { v: f64 },
    /// Point charge or magnetic monopole.
    Monopole { x: f64, y: f64, q: f64 },
    /// Pointlike 3D dipole with moment (px, py).
    Dipole { x: f64, y: f64, px: f64, py: f64 },
    /// 2D line dipole: two infinitesimally close opposite line charges.
    Dipole2d { x: f64, y: f64, px: f64, py: f64 },
    /// Pointlike quadrupole; qxx/qxy/qyy are the moment matrix entries.
    Quadrupole {
        x: f64,
        y: f64,
        qxx: f64,
        qxy: f64,
        qyy: f64,
    },
    /// Infinite straight current-carrying wire perpendicular to the image.
    Wire { x: f64, y: f64, i: f64 },
    /// Infinite straight charged wire, charge q per unit length.
    ChargedWire { x: f64, y: f64, q: f64 },
    /// Finite charged line segment inside the image plane.
    ChargedLine {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        q: f64,
    },
    /// Charged plane through (x0,y0)-(x1,y1), infinite in z.
    ChargedPlane {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        q: f64,
    },
    /// Charged rectangle through (x0,y0)-(x1,y1) with finite z-extent lz.
    ChargedRect {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        lz: f64,
        q: f64,
    },
    /// Homogeneously charged disc with its symmetry axis in the image
    /// plane; (x0,y0)-(x1,y1) is the visible diameter.
    ChargedDisc {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        q: f64,
    },
    /// Infinite thin sheet through (x0,y0)-(x1,y1) carrying current i
    /// out of the image plane.
    SheetCurrent {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        i: f64,
    },
    /// Circular current loop perpendicular to the image plane; phi is the
    /// axis direction, r the loop radius.
    RingCurrent {
        x: f64,
        y: f64,
        phi: f64,
        r: f64,
        i: f64,
    },
    /// Dense cylindrical coil (or cylinder magnet): axis direction phi,
    /// radius r, half-length lhalf, total sheet current i.
    Coil {
        x: f64,
        y: f64,
        phi: f64,
        r: f64,
        lhalf: f64,
        i: f64,
    },
    /// User-defined callbacks; not serializable.
    #[serde(skip)]
    Custom(CustomSource),
}

impl Source {
    /// Short kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Homogeneous { .. } => "homogeneous",
            Self::Potential { .. } => "potential",
            Self::Monopole { .. } => "monopole",
            Self::Dipole { .. } => "dipole",
            Self::Dipole2d { .. } => "dipole2d",
            Self::Quadrupole { .. } => "quadrupole",
            Self::Wire { .. } => "wire",
            Self::ChargedWire { .. } => "charged_wire",
            Self::ChargedLine { .. } => "charged_line",
            Self::ChargedPlane { .. } => "charged_plane",
            Self::ChargedRect { .. } => "charged_rect",
            Self::ChargedDisc { .. } => "charged_disc",
            Self::SheetCurrent { .. } => "sheet_current",
            Self::RingCurrent { .. } => "ring_current",
            Self::Coil { .. } => "coil",
            Self::Custom(_) => "custom",
        }
    }

    /// Geometric validity check; the reason string names the offending
    /// parameter.
    pub(crate) fn validate(&self) -> Result<(), String> {
        let segment = |x0: f64, y0: f64, x1: f64, y1: f64| {
            if (x1 - x0).hypot(y1 - y0) == 0.0 {
                Err("segment (x0,y0)-(x1,y1) has zero length".to_string())
            } else {
                Ok(())
            }
        };
        match *self {
            Self::ChargedLine { x0, y0, x1, y1, .. }
            | Self::ChargedPlane { x0, y0, x1, y1, .. }
            | Self::ChargedDisc { x0, y0, x1, y1, .. }
            | Self::SheetCurrent { x0, y0, x1, y1, .. } => segment(x0, y0, x1, y1),
            Self::ChargedRect { x0, y0, x1, y1, lz, .. } => {
                segment(x0, y0, x1, y1)?;
                if lz == 0.0 {
                    Err("lz must be nonzero".to_string())
                } else {
                    Ok(())
                }
            }
            Self::RingCurrent { r, .. } => {
                if r > 0.0 {
                    Ok(())
                } else {
                    Err("radius r must be positive".to_string())
                }
            }
            Self::Coil { r, lhalf, .. } => {
                if r <= 0.0 {
                    Err("radius r must be positive".to_string())
                } else if lhalf == 0.0 {
                    Err("half-length lhalf must be nonzero".to_string())
                } else {
                    Ok(())
                }
            }
            Self::Custom(ref c) => {
                if c.field.is_none() && c.potential.is_none() {
                    Err("custom source needs a field or a potential callback".to_string())
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_line_is_invalid() {
        let s = Source::ChargedLine {
            x0: 1.0,
            y0: 2.0,
            x1: 1.0,
            y1: 2.0,
            q: 1.0,
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn flat_rect_is_invalid() {
        let s = Source::ChargedRect {
            x0: 0.0,
            y0: 0.0,
            x1: 1.0,
            y1: 0.0,
            lz: 0.0,
            q: 1.0,
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn negative_ring_radius_is_invalid() {
        let s = Source::RingCurrent {
            x: 0.0,
            y: 0.0,
            phi: 0.0,
            r: -1.0,
            i: 1.0,
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn empty_custom_is_invalid() {
        assert!(Source::Custom(CustomSource::default()).validate().is_err());
    }

    #[test]
    fn monopole_is_always_valid() {
        let s = Source::Monopole {
            x: 0.0,
            y: 0.0,
            q: -1.0,
        };
        assert!(s.validate().is_ok());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let s = Source::Monopole {
            x: 1.0,
            y: 2.0,
            q: -1.0,
        };
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"kind\":\"monopole\""));
    }
}
