pub mod elliptic;
pub mod error;
pub mod quadrature;
pub mod roots;
pub mod spline;
pub mod vec2;

pub use error::{CoreError, CoreResult};
pub use vec2::Vec2;
