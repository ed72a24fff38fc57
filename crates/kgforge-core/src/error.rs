//! Knowledge error types.

use thiserror::Error;

/// Errors raised at the knowledge boundary: embedding backends and raw
/// record decoding.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// Embedding generation error.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// A raw record could not be decoded.
    #[error("Decode error on line {line}: {message}")]
    Decode { line: usize, message: String },

    /// Embedding backend returned an unexpected number of vectors.
    #[error("Embedding backend returned {got} vectors for {expected} inputs")]
    BatchMismatch { expected: usize, got: usize },
}
