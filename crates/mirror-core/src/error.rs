//! Error types for mirror-core

use std::path::PathBuf;

use serde::Serialize;

/// Result type for mirror-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Invocation-level failures.
///
/// Per-key fetch and delete failures never surface here; they are recorded
/// in the [`crate::ReconcileReport`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Required settings are missing or invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The bucket listing could not be retrieved
    #[error("Failed to list bucket '{bucket}': {source}")]
    Listing {
        bucket: String,
        #[source]
        source: mirror_store::Error,
    },

    /// The working tree could not be enumerated
    #[error("Failed to enumerate working tree at {path}: {message}")]
    LocalTree { path: PathBuf, message: String },

    /// The working copy could not be cloned or prepared
    #[error("Failed to prepare working copy: {0}")]
    Clone(#[source] mirror_git::Error),

    /// Staging or diffing the working tree failed
    #[error("Failed to stage changes: {0}")]
    Stage(#[source] mirror_git::Error),

    /// The commit could not be created; nothing was pushed
    #[error("Commit failed: {0}")]
    Commit(#[source] mirror_git::Error),

    /// The commit exists locally but the push failed or was rejected
    #[error("Commit {commit} created but push failed: {source}")]
    Push {
        commit: String,
        #[source]
        source: mirror_git::Error,
    },

    /// The fetch worker pool could not be started
    #[error("Failed to start fetch workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// Filesystem error from mirror-fs
    #[error(transparent)]
    Fs(#[from] mirror_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// The enumerated cause reported to the caller.
    pub fn cause(&self) -> FailureCause {
        match self {
            Self::Config { .. } => FailureCause::Config,
            Self::Listing { .. } => FailureCause::Listing,
            Self::LocalTree { .. } => FailureCause::LocalTree,
            Self::Clone(_) => FailureCause::Clone,
            Self::Stage(_) => FailureCause::Stage,
            Self::Commit(_) => FailureCause::Commit,
            Self::Push { .. } => FailureCause::Push,
            Self::WorkerPool(_) | Self::Fs(_) | Self::Io(_) => FailureCause::Internal,
        }
    }
}

/// Why an invocation failed, as reported to the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureCause {
    Config,
    Listing,
    LocalTree,
    Clone,
    Stage,
    Commit,
    Push,
    Internal,
}

impl FailureCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Listing => "listing",
            Self::LocalTree => "local-tree",
            Self::Clone => "clone",
            Self::Stage => "stage",
            Self::Commit => "commit",
            Self::Push => "push",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
