//! The version-controlled working tree the engine writes into

use mirror_fs::NormalizedPath;
use mirror_git::{Author, ChangeSet, WorkingCopy};

/// Version-control operations the engine needs from a working tree.
///
/// [`WorkingCopy`] is the production implementation; tests may substitute
/// their own to exercise failure paths.
pub trait WorkingTree: Send + Sync {
    /// Root of the working tree on disk.
    fn root(&self) -> &NormalizedPath;

    /// Whether the repository's own ignore rules exclude `relative`.
    fn is_vcs_ignored(&self, relative: &str) -> mirror_git::Result<bool>;

    /// Stage every addition, modification and deletion.
    fn stage_all(&self) -> mirror_git::Result<()>;

    /// Staged changes relative to the last commit.
    fn diff_against_head(&self) -> mirror_git::Result<ChangeSet>;

    /// Commit the staged state, returning the new commit id.
    fn commit(&self, message: &str, author: &Author) -> mirror_git::Result<String>;

    /// Push the current branch to `remote`.
    fn push(&self, remote: &str) -> mirror_git::Result<()>;
}

impl WorkingTree for WorkingCopy {
    fn root(&self) -> &NormalizedPath {
        WorkingCopy::root(self)
    }

    fn is_vcs_ignored(&self, relative: &str) -> mirror_git::Result<bool> {
        self.is_path_ignored(relative)
    }

    fn stage_all(&self) -> mirror_git::Result<()> {
        WorkingCopy::stage_all(self)
    }

    fn diff_against_head(&self) -> mirror_git::Result<ChangeSet> {
        WorkingCopy::diff_against_head(self)
    }

    fn commit(&self, message: &str, author: &Author) -> mirror_git::Result<String> {
        WorkingCopy::commit(self, message, author).map(|oid| oid.to_string())
    }

    fn push(&self, remote: &str) -> mirror_git::Result<()> {
        WorkingCopy::push(self, remote)
    }
}
