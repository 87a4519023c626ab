/// Errors produced by the fieldline-core library.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("root is not bracketed on [{a}, {b}]")]
    NotBracketed { a: f64, b: f64 },

    #[error("numerical convergence failed after {iterations} iterations")]
    ConvergenceFailed { iterations: usize },
}

/// Convenience result type for fieldline-core operations.
pub type CoreResult<T> = Result<T, CoreError>;
