//! Index-versus-HEAD change sets

use std::collections::BTreeMap;

use serde::Serialize;

/// How a single path differs from the last commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
    TypeChanged,
}

impl ChangeKind {
    pub(crate) fn from_delta(delta: git2::Delta) -> Option<Self> {
        match delta {
            git2::Delta::Added | git2::Delta::Copied => Some(Self::Added),
            git2::Delta::Modified => Some(Self::Modified),
            git2::Delta::Deleted => Some(Self::Deleted),
            git2::Delta::Renamed => Some(Self::Renamed),
            git2::Delta::Typechange => Some(Self::TypeChanged),
            _ => None,
        }
    }
}

/// Staged differences against HEAD, keyed by working-tree relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    changes: BTreeMap<String, ChangeKind>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, kind: ChangeKind) {
        self.changes.insert(path.into(), kind);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn get(&self, path: &str) -> Option<ChangeKind> {
        self.changes.get(path).copied()
    }

    /// Changed paths in sorted order.
    pub fn changed_paths(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ChangeKind)> {
        self.changes.iter().map(|(path, kind)| (path.as_str(), *kind))
    }
}
