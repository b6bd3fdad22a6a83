//! Reconciliation planning
//!
//! Compares a snapshot of the working tree with a bucket listing and derives
//! which keys are fetch candidates and which local files vanished remotely.
//! Planning does no I/O beyond the initial tree enumeration.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use mirror_fs::path::GIT_DIR;
use mirror_store::RemoteObject;
use serde::Serialize;
use walkdir::WalkDir;

use crate::config::SETTINGS_DOCUMENT_KEY;
use crate::{Error, Result};

/// One file found in the working tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LocalEntry {
    /// Forward-slash path relative to the tree root
    pub relative_path: String,
    pub exists_on_disk: bool,
}

impl LocalEntry {
    pub fn new(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            exists_on_disk: true,
        }
    }
}

/// A remote object scheduled for comparison and possible download.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct FetchTask {
    pub key: String,
    pub content_tag: String,
    pub size: u64,
}

impl From<RemoteObject> for FetchTask {
    fn from(object: RemoteObject) -> Self {
        Self {
            key: object.key,
            content_tag: object.content_tag,
            size: object.size,
        }
    }
}

/// Result of planning one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    /// Candidates for download, sorted by key
    pub to_fetch: Vec<FetchTask>,
    /// Local paths absent from the listing
    pub to_delete: BTreeSet<String>,
    /// Keys above the size ceiling, left untouched
    pub oversized: Vec<String>,
    /// Directory markers and reserved keys
    pub skipped: Vec<String>,
}

impl ReconciliationPlan {
    pub fn fetch_keys(&self) -> impl Iterator<Item = &str> {
        self.to_fetch.iter().map(|t| t.key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.to_fetch.is_empty() && self.to_delete.is_empty()
    }
}

/// Enumerate every regular file below `root`, except VCS metadata.
///
/// Hidden files are included. Symlinks are not followed.
pub fn enumerate_local_tree(root: &Path) -> Result<Vec<LocalEntry>> {
    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !(e.depth() == 1 && e.file_name() == GIT_DIR));

    for entry in walker {
        let entry = entry.map_err(|e| Error::LocalTree {
            path: e.path().unwrap_or(root).to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::LocalTree {
                path: entry.path().to_path_buf(),
                message: e.to_string(),
            })?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push(LocalEntry::new(relative));
    }

    entries.sort();
    tracing::debug!(root = %root.display(), files = entries.len(), "Enumerated working tree");
    Ok(entries)
}

/// Derives a [`ReconciliationPlan`] from a tree snapshot and a listing.
#[derive(Debug, Clone)]
pub struct Planner {
    size_ceiling: u64,
    reserved: BTreeSet<String>,
}

impl Planner {
    /// A planner that reserves the settings document key.
    pub fn new(size_ceiling: u64) -> Self {
        Self {
            size_ceiling,
            reserved: BTreeSet::from([SETTINGS_DOCUMENT_KEY.to_string()]),
        }
    }

    /// Never mirror `key`, and never delete it locally either.
    pub fn reserve(mut self, key: impl Into<String>) -> Self {
        self.reserved.insert(key.into());
        self
    }

    pub fn size_ceiling(&self) -> u64 {
        self.size_ceiling
    }

    pub fn plan(&self, local: &[LocalEntry], remote: &[RemoteObject]) -> ReconciliationPlan {
        let mut to_delete: BTreeSet<String> = local
            .iter()
            .filter(|e| e.exists_on_disk)
            .map(|e| e.relative_path.clone())
            .collect();

        let mut fetch: BTreeMap<&str, &RemoteObject> = BTreeMap::new();
        let mut oversized = Vec::new();
        let mut skipped = Vec::new();

        for object in remote {
            to_delete.remove(&object.key);

            if object.size > self.size_ceiling {
                tracing::debug!(key = %object.key, size = object.size, "Over size ceiling");
                oversized.push(object.key.clone());
                continue;
            }
            if object.is_directory_marker() || self.reserved.contains(&object.key) {
                skipped.push(object.key.clone());
                continue;
            }
            if fetch.insert(&object.key, object).is_some() {
                tracing::warn!(key = %object.key, "Duplicate key in listing, keeping last entry");
            }
        }

        oversized.sort();
        oversized.dedup();
        skipped.sort();
        skipped.dedup();

        // A key listed twice with different sizes may land in both sets.
        fetch.retain(|key, _| oversized.binary_search_by(|k| k.as_str().cmp(*key)).is_err());

        ReconciliationPlan {
            to_fetch: fetch.into_values().cloned().map(FetchTask::from).collect(),
            to_delete,
            oversized,
            skipped,
        }
    }
}

/// Plan with the default reserved keys.
pub fn plan(local: &[LocalEntry], remote: &[RemoteObject], size_ceiling: u64) -> ReconciliationPlan {
    Planner::new(size_ceiling).plan(local, remote)
}
