//! Typed termination and progress events.
//!
//! Every extraordinary event during integration is recorded on the
//! finished line and mirrored to `tracing`, so a test harness can assert
//! termination reasons without scraping log output.

use fieldline_core::Vec2;
use serde::{Deserialize, Serialize};

/// Something noteworthy that happened while integrating a field line.
///
/// All of these are normal outcomes; the tracer always returns a
/// well-formed node list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TraceEvent {
    /// The line returned to its seed and was closed into a loop.
    ClosedLoop { at: Vec2 },
    /// The line ran into a monopole and was terminated on it.
    MonopoleReached { at: Vec2 },
    /// The line ran into a dipole (and possibly passed through).
    DipoleReached { at: Vec2 },
    /// A direction-field corner was located and inserted.
    CornerAt { at: Vec2 },
    /// The direction reversed again right after a corner; the line ends.
    EndEdge { at: Vec2 },
    /// A stop function became positive; the line was clipped to its zero.
    Stopped { at: Vec2 },
    /// The field vanished; the line cannot continue.
    ZeroField { at: Vec2 },
    /// The position stopped moving at the smallest step size.
    Stalled { at: Vec2 },
    /// The step budget `maxn` ran out.
    StepBudgetExceeded { steps: usize, at: Vec2 },
    /// The arc-length budget `maxr` ran out.
    RangeExceeded { range: f64, at: Vec2 },
}

impl TraceEvent {
    pub(crate) fn emit(&self) {
        match self {
            Self::ClosedLoop { at } => tracing::debug!(x = at.x, y = at.y, "closed at"),
            Self::MonopoleReached { at } => tracing::debug!(x = at.x, y = at.y, "monopole reached at"),
            Self::DipoleReached { at } => tracing::debug!(x = at.x, y = at.y, "dipole reached at"),
            Self::CornerAt { at } => tracing::debug!(x = at.x, y = at.y, "corner at"),
            Self::EndEdge { at } => tracing::debug!(x = at.x, y = at.y, "end edge at"),
            Self::Stopped { at } => tracing::debug!(x = at.x, y = at.y, "stopped at"),
            Self::ZeroField { at } => tracing::debug!(x = at.x, y = at.y, "zero field at"),
            Self::Stalled { at } => tracing::debug!(x = at.x, y = at.y, "stalled at"),
            Self::StepBudgetExceeded { steps, at } => {
                tracing::debug!(steps, x = at.x, y = at.y, "integration steps exceeded at");
            }
            Self::RangeExceeded { range, at } => {
                tracing::debug!(range, x = at.x, y = at.y, "integration boundary exceeded at");
            }
        }
    }
}
