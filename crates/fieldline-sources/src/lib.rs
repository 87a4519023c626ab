//! Analytic source fields for 2D field-line plotting.
//!
//! A [`Field`] is an ordered, immutable collection of [`Source`] elements.
//! Every element contributes a closed-form field vector, and most also a
//! scalar potential; contributions superpose additively. Units follow the
//! magnetizing-field convention (H for magnetic sources, D for electric
//! ones), so no vacuum constants appear anywhere.

pub mod electric;
pub mod element;
pub mod field;
pub mod magnetic;

pub use element::{CustomSource, Source};
pub use field::{Field, FieldError, Pole, PoleKind};
