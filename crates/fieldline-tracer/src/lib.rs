//! Field-line tracing over analytic 2D source fields.
//!
//! [`FieldLine::trace`] integrates the direction field of a
//! [`fieldline_sources::Field`] from a seed point with an adaptive
//! fourth-order Runge-Kutta scheme, handles the places where direction
//! fields stop being smooth (monopoles, dipoles, corners on charged
//! surfaces, closing loops), and renders the result as bend-adaptive
//! polylines cut at the image bounds. [`Startpath`] places seeds along a
//! curve so that line density is proportional to the flux crossing it.
//!
//! Tracing is synchronous and purely functional over the field: any number
//! of lines can be traced against one field concurrently.

pub mod diagnostics;
pub mod line;
pub mod options;
pub mod polyline;
pub mod startpath;

pub use diagnostics::TraceEvent;
pub use line::{FieldLine, Node};
pub use options::{Direction, TraceOptions};
pub use polyline::{Bounds, Polyline};
pub use startpath::Startpath;

/// Errors produced by tracer construction.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error(transparent)]
    Core(#[from] fieldline_core::CoreError),
}
