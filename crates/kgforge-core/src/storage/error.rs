use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting the triple store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt snapshot {path}: duplicate fingerprint {fingerprint}")]
    DuplicateFingerprint { path: PathBuf, fingerprint: String },
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}
