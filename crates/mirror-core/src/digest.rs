//! Remote/local content comparison

use std::path::Path;

use mirror_fs::DigestAlgorithm;
use mirror_fs::checksum::compute_file_digest;

use crate::plan::FetchTask;

/// Strip surrounding literal quotes and whitespace from a content tag.
pub fn normalize_tag(tag: &str) -> &str {
    tag.trim().trim_matches('"')
}

/// Decides whether a remote object must be downloaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestComparator {
    algorithm: DigestAlgorithm,
}

impl DigestComparator {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// `true` unless the local file exists and hashes to the remote tag.
    ///
    /// A size mismatch answers without hashing. Read errors answer `true`.
    /// Multipart tags (`<hex>-<parts>`) never equal a plain digest, so those
    /// objects are always fetched.
    pub fn needs_fetch(&self, remote: &FetchTask, local_path: &Path) -> bool {
        let metadata = match std::fs::metadata(local_path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return true,
            Err(e) => {
                tracing::debug!(path = %local_path.display(), error = %e, "Cannot stat local file");
                return true;
            }
        };

        if metadata.len() != remote.size {
            tracing::debug!(key = %remote.key, local = metadata.len(), remote = remote.size, "Size differs");
            return true;
        }

        match compute_file_digest(local_path, self.algorithm) {
            Ok(local) => !local.eq_ignore_ascii_case(normalize_tag(&remote.content_tag)),
            Err(e) => {
                tracing::debug!(path = %local_path.display(), error = %e, "Cannot hash local file");
                true
            }
        }
    }
}
