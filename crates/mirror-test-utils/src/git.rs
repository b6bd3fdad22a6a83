//! Git remote fixtures.
//!
//! Remotes are bare repositories on local disk so clone and push exercise the
//! real libgit2 code paths without a network.

use std::fs;
use std::path::Path;

use git2::{IndexAddOption, Repository, Signature};

const BRANCH: &str = "main";

/// Initialises a real, empty git repository using `git2`.
///
/// # Panics
/// Panics if `git2::Repository::init` fails.
pub fn real_git_repo(path: &Path) -> Repository {
    Repository::init(path).unwrap_or_else(|e| {
        panic!(
            "real_git_repo: failed to init repository at {}: {e}",
            path.display()
        )
    })
}

/// Creates an empty bare repository whose HEAD points at `main`.
///
/// Returns the path as a clone URL.
///
/// # Panics
/// Panics if the repository cannot be created.
pub fn empty_bare_remote(path: &Path) -> String {
    let repo = Repository::init_bare(path)
        .unwrap_or_else(|e| panic!("empty_bare_remote: init failed: {e}"));
    repo.set_head(&format!("refs/heads/{BRANCH}"))
        .unwrap_or_else(|e| panic!("empty_bare_remote: set_head failed: {e}"));
    path.to_string_lossy().into_owned()
}

/// Creates a bare repository at `path` with one commit on `main` holding
/// `files` (relative path, content).
///
/// Returns the path as a clone URL.
///
/// # Panics
/// Panics if any git operation fails.
pub fn bare_remote_with_files(path: &Path, files: &[(&str, &str)]) -> String {
    let url = empty_bare_remote(path);

    let seed_dir = tempfile::TempDir::new().expect("bare_remote_with_files: temp dir");
    let seed = real_git_repo(seed_dir.path());
    seed.set_head(&format!("refs/heads/{BRANCH}")).unwrap();

    for (relative, content) in files {
        let target = seed_dir.path().join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&target, content).unwrap();
    }

    let mut index = seed.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::FORCE, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = seed.find_tree(tree_id).unwrap();
    let sig = Signature::now("Fixture", "fixture@example.com").unwrap();
    seed.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
        .unwrap();

    let mut remote = seed.remote("origin", &url).unwrap();
    let refspec = format!("refs/heads/{BRANCH}:refs/heads/{BRANCH}");
    remote
        .push(&[refspec.as_str()], None)
        .unwrap_or_else(|e| panic!("bare_remote_with_files: push failed: {e}"));

    url
}

/// The branch a test should inspect: `main` if present, else the first one.
///
/// A clone of an empty remote may push under libgit2's default branch name.
fn mirrored_branch(repo: &Repository) -> Option<git2::Reference<'_>> {
    if let Ok(reference) = repo.find_reference(&format!("refs/heads/{BRANCH}")) {
        return Some(reference);
    }
    let mut branches = repo.branches(Some(git2::BranchType::Local)).ok()?;
    branches
        .find_map(|b| b.ok())
        .map(|(branch, _)| branch.into_reference())
}

/// Number of commits on the remote's mirrored branch.
pub fn commit_count(bare: &Path) -> usize {
    let repo = Repository::open_bare(bare).unwrap();
    let Some(reference) = mirrored_branch(&repo) else {
        return 0;
    };
    let mut walk = repo.revwalk().unwrap();
    walk.push(reference.target().unwrap()).unwrap();
    walk.count()
}

/// Sorted file paths in the tree of the remote's mirrored branch.
pub fn tree_files(bare: &Path) -> Vec<String> {
    let repo = Repository::open_bare(bare).unwrap();
    let Some(reference) = mirrored_branch(&repo) else {
        return Vec::new();
    };
    let tree = reference.peel_to_tree().unwrap();

    let mut files = Vec::new();
    tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() == Some(git2::ObjectType::Blob) {
            files.push(format!("{}{}", root, entry.name().unwrap_or("")));
        }
        git2::TreeWalkResult::Ok
    })
    .unwrap();
    files.sort();
    files
}

/// Content of `relative` on the remote's mirrored branch, if present.
pub fn file_content(bare: &Path, relative: &str) -> Option<String> {
    let repo = Repository::open_bare(bare).unwrap();
    let reference = mirrored_branch(&repo)?;
    let tree = reference.peel_to_tree().ok()?;
    let entry = tree.get_path(Path::new(relative)).ok()?;
    let blob = repo.find_blob(entry.id()).ok()?;
    Some(String::from_utf8_lossy(blob.content()).into_owned())
}

/// First line of the newest commit message and its author (name, email).
pub fn head_commit_summary(bare: &Path) -> Option<(String, String, String)> {
    let repo = Repository::open_bare(bare).unwrap();
    let reference = mirrored_branch(&repo)?;
    let commit = reference.peel_to_commit().ok()?;
    let author = commit.author();
    Some((
        commit.summary().unwrap_or("").to_string(),
        author.name().unwrap_or("").to_string(),
        author.email().unwrap_or("").to_string(),
    ))
}

/// One entry of [`commit_log`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedCommit {
    pub summary: String,
    pub author: String,
    pub email: String,
}

/// Commits on the mirrored branch of the repository at `path`, newest first.
///
/// Works on bare remotes and on clones.
pub fn commit_log(path: &Path) -> Vec<LoggedCommit> {
    let repo = Repository::open(path).unwrap();
    let Some(reference) = mirrored_branch(&repo) else {
        return Vec::new();
    };
    let mut walk = repo.revwalk().unwrap();
    walk.set_sorting(git2::Sort::TOPOLOGICAL).unwrap();
    walk.push(reference.target().unwrap()).unwrap();

    walk.map(|oid| {
        let commit = repo.find_commit(oid.unwrap()).unwrap();
        let author = commit.author();
        LoggedCommit {
            summary: commit.summary().unwrap_or("").to_string(),
            author: author.name().unwrap_or("").to_string(),
            email: author.email().unwrap_or("").to_string(),
        }
    })
    .collect()
}
