//! Commit decision

use mirror_git::ChangeSet;

use crate::tree::WorkingTree;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The staged diff is non-empty
    Commit(ChangeSet),
    /// Nothing changed since the last commit
    NoChanges,
}

impl GateDecision {
    pub fn is_commit(&self) -> bool {
        matches!(self, Self::Commit(_))
    }
}

/// Authorizes a commit only when the working tree differs from HEAD.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeGate;

impl ChangeGate {
    /// Stage everything and diff the index against HEAD.
    ///
    /// An unborn HEAD is compared against the empty tree.
    pub fn should_commit(&self, tree: &dyn WorkingTree) -> Result<GateDecision> {
        tree.stage_all().map_err(Error::Stage)?;
        let changes = tree.diff_against_head().map_err(Error::Stage)?;

        if changes.is_empty() {
            tracing::info!("No changes to commit");
            Ok(GateDecision::NoChanges)
        } else {
            tracing::info!(changed = changes.len(), "Changes staged");
            Ok(GateDecision::Commit(changes))
        }
    }
}
