//! Trace configuration.

use fieldline_core::Vec2;
use serde::{Deserialize, Serialize};

/// A scalar function over the plane used for bounds and stop conditions;
/// positive means "outside" / "stop here".
pub type BoundaryFn = Box<dyn Fn(Vec2) -> f64 + Send + Sync>;

/// Which way to integrate from the seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
    Both,
}

/// Options for [`crate::FieldLine::trace`].
pub struct TraceOptions {
    /// Optional start direction; overrides the field direction at the seed.
    pub start_v: Option<Vec2>,
    /// Optional dipole start displacement: the very first step is taken
    /// exactly along this vector (used to leave a dipole singularity in a
    /// controlled direction).
    pub start_d: Option<Vec2>,
    pub direction: Direction,
    /// Maximum number of integration steps per side.
    pub maxn: usize,
    /// Maximum arc length per side, in field units.
    pub maxr: f64,
    /// Maximum step size.
    pub hmax: f64,
    /// Number of dipoles the line may pass through (-1 = unlimited).
    pub pass_dipoles: i32,
    /// Tolerance for recognizing a closing loop.
    pub path_close_tol: f64,
    /// Additional image bound: lines are truncated where this evaluates
    /// positive (applied after integration, in `get_polylines`).
    pub bounds_func: Option<BoundaryFn>,
    /// Stop functions that terminate integration where they evaluate
    /// positive; index 0 applies to the backward side, index 1 forward.
    pub stop_funcs: [Option<BoundaryFn>; 2],
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            start_v: None,
            start_d: None,
            direction: Direction::Forward,
            maxn: 1000,
            maxr: 300.0,
            hmax: 1.0,
            pass_dipoles: 0,
            path_close_tol: 5e-3,
            bounds_func: None,
            stop_funcs: [None, None],
        }
    }
}

impl std::fmt::Debug for TraceOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceOptions")
            .field("start_v", &self.start_v)
            .field("start_d", &self.start_d)
            .field("direction", &self.direction)
            .field("maxn", &self.maxn)
            .field("maxr", &self.maxr)
            .field("hmax", &self.hmax)
            .field("pass_dipoles", &self.pass_dipoles)
            .field("path_close_tol", &self.path_close_tol)
            .field("bounds_func", &self.bounds_func.as_ref().map(|_| "Fn"))
            .field(
                "stop_funcs",
                &[
                    self.stop_funcs[0].as_ref().map(|_| "Fn"),
                    self.stop_funcs[1].as_ref().map(|_| "Fn"),
                ],
            )
            .finish()
    }
}
