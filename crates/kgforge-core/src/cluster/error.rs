use thiserror::Error;

/// Errors raised by clustering backends.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Cannot cluster an empty set of points")]
    EmptyInput,

    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Embedding {0} contains non-finite values")]
    NonFinite(usize),

    #[error("Invalid clustering parameter: {0}")]
    InvalidParameter(String),
}
