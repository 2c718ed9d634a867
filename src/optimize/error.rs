//! Error types for the LP backend.

/// Result type for LP backend operations.
pub type OptimizeResult<T> = Result<T, OptimizeError>;

/// Errors raised by the LP backend before any pivoting happens.
///
/// Solver outcomes such as infeasibility are not errors at this level; they are
/// reported through the result status so callers can inspect the message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptimizeError {
    /// Invalid interval provided (e.g., a variable bound with lower > upper).
    #[error("Invalid interval [{a}, {b}] in {context}: bounds must satisfy a <= b")]
    InvalidInterval { a: f64, b: f64, context: String },

    /// Invalid parameter value.
    #[error("Invalid parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Invalid input array size or dimensions.
    #[error("Invalid input in {context}")]
    InvalidInput { context: String },
}
