//! Error types for mirror-git

use std::path::PathBuf;

/// Result type for mirror-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mirror-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] mirror_fs::Error),

    #[error("Failed to clone {url}: {message}")]
    CloneFailed { url: String, message: String },

    #[error("Not a git working copy: {path}")]
    NotARepository { path: PathBuf },

    #[error("Remote '{name}' not found")]
    RemoteNotFound { name: String },

    #[error("HEAD is detached; cannot determine the branch to push")]
    DetachedHead,

    #[error("Push failed: {message}")]
    PushFailed { message: String },

    #[error("Push of {reference} rejected by remote: {message}")]
    PushRejected { reference: String, message: String },
}
