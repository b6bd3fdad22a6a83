//! Error types for mirror-store

use std::path::PathBuf;

/// Result type for mirror-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur talking to an object store
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Bucket '{bucket}' not found")]
    BucketNotFound { bucket: String },

    #[error("Object '{key}' not found in bucket '{bucket}'")]
    ObjectNotFound { bucket: String, key: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list bucket '{bucket}': {message}")]
    Listing { bucket: String, message: String },

    #[error("Transport error for '{key}': {message}")]
    Transport { key: String, message: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
