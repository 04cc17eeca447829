use thiserror::Error;

/// A result type for lazy covariance algebra
pub type Result<T> = std::result::Result<T, LazyGpError>;

/// An error raised by a [`LazyMatrix`](crate::lazy::LazyMatrix) operation or
/// one of the inference algorithms driving it
#[derive(Error, Debug)]
pub enum LazyGpError {
    /// When operand dimensions do not line up
    #[error("Shape error: {0}")]
    ShapeError(String),
    /// When input data is degenerate (e.g. fewer than 2 distinct points along a dimension)
    #[error("Data error: {0}")]
    DataError(String),
    /// When an iterative algorithm hits its iteration cap before reaching tolerance
    #[error("No convergence after {iterations} iterations, residual {residual}")]
    NonConvergence {
        /// Number of iterations performed
        iterations: usize,
        /// Residual norm of the best iterate found
        residual: f64,
    },
    /// When a variant cannot support the requested operation
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// When a dense factorization fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
}
