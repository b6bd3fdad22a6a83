//! Delete phase
//!
//! Removes local files whose keys vanished from the bucket. Runs strictly
//! after the fetch phase. Ignored paths and unlisted hidden paths survive.
//! Temporary files orphaned by an interrupted download are always removed.

use std::collections::BTreeSet;

use mirror_fs::{NormalizedPath, io, is_hidden};
use serde::Serialize;

use crate::ignore::IgnoreFilter;

/// Which hidden paths may be deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletePolicy {
    hidden_allowlist: Vec<String>,
}

impl DeletePolicy {
    pub fn new(hidden_allowlist: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            hidden_allowlist: hidden_allowlist.into_iter().map(Into::into).collect(),
        }
    }

    /// Non-hidden paths are always deletable; hidden ones only under an allow-listed prefix.
    pub fn permits(&self, path: &str) -> bool {
        !is_hidden(path)
            || self
                .hidden_allowlist
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    /// Kept because of an ignore rule or the hidden-path policy
    pub protected: Vec<String>,
    /// `(path, reason)` for removals that failed
    pub failed: Vec<(String, String)>,
}

/// Remove every candidate the filter and policy allow.
pub fn apply_deletions(
    root: &NormalizedPath,
    to_delete: &BTreeSet<String>,
    filter: &IgnoreFilter<'_>,
    policy: &DeletePolicy,
) -> DeleteReport {
    let mut report = DeleteReport::default();

    for path in to_delete {
        let orphaned = io::is_partial_file(path);
        if !orphaned && (filter.is_ignored(path) || !policy.permits(path)) {
            tracing::debug!(path = %path, "Keeping protected path");
            report.protected.push(path.clone());
            continue;
        }

        match io::remove_file(&root.join(path)) {
            Ok(()) => {
                tracing::debug!(path = %path, "Deleted");
                report.deleted.push(path.clone());
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Failed to delete");
                report.failed.push((path.clone(), e.to_string()));
            }
        }
    }

    tracing::info!(
        deleted = report.deleted.len(),
        protected = report.protected.len(),
        failed = report.failed.len(),
        "Delete phase complete"
    );
    report
}
