//! Tests for clone, staging, diffing, committing and pushing

use mirror_git::{Author, ChangeKind, CloneOptions, Error, WorkingCopy};
use mirror_test_utils::git::{
    bare_remote_with_files, commit_count, commit_log, empty_bare_remote, file_content, head_commit_summary,
    tree_files,
};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

fn author() -> Author {
    Author::new("Mirror Bot", "mirror@example.com")
}

fn clone_fixture(files: &[(&str, &str)]) -> (TempDir, std::path::PathBuf, WorkingCopy) {
    let temp = TempDir::new().unwrap();
    let remote = temp.path().join("remote.git");
    let url = bare_remote_with_files(&remote, files);
    let work = WorkingCopy::clone(&url, &temp.path().join("work"), &CloneOptions::default())
        .expect("clone should succeed");
    (temp, remote, work)
}

#[test]
fn test_clone_checks_out_files() {
    let (_temp, _remote, work) = clone_fixture(&[("README.md", "# hi"), ("notes/a.md", "a")]);

    let root = work.root().to_native();
    assert_eq!(fs::read_to_string(root.join("README.md")).unwrap(), "# hi");
    assert_eq!(fs::read_to_string(root.join("notes/a.md")).unwrap(), "a");
    assert_eq!(work.current_branch().unwrap(), Some("main".to_string()));
}

#[test]
fn test_clone_missing_remote_is_clone_failed() {
    let temp = TempDir::new().unwrap();
    let result = WorkingCopy::clone(
        &temp.path().join("missing.git").to_string_lossy(),
        &temp.path().join("work"),
        &CloneOptions::default(),
    );
    assert!(matches!(result, Err(Error::CloneFailed { .. })));
}

#[test]
fn test_open_non_repository() {
    let temp = TempDir::new().unwrap();
    let result = WorkingCopy::open(temp.path());
    assert!(matches!(result, Err(Error::NotARepository { .. })));
}

#[test]
fn test_clean_tree_has_empty_diff() {
    let (_temp, _remote, work) = clone_fixture(&[("README.md", "# hi")]);

    work.stage_all().unwrap();
    assert!(work.diff_against_head().unwrap().is_empty());
}

#[test]
fn test_diff_reports_added_modified_deleted() {
    let (_temp, _remote, work) =
        clone_fixture(&[("keep.md", "keep"), ("edit.md", "old"), ("drop.md", "bye")]);
    let root = work.root().to_native();

    fs::write(root.join("edit.md"), "new").unwrap();
    fs::remove_file(root.join("drop.md")).unwrap();
    fs::create_dir_all(root.join("dir")).unwrap();
    fs::write(root.join("dir/new.md"), "fresh").unwrap();

    work.stage_all().unwrap();
    let changes = work.diff_against_head().unwrap();

    assert_eq!(changes.len(), 3);
    assert_eq!(changes.get("edit.md"), Some(ChangeKind::Modified));
    assert_eq!(changes.get("drop.md"), Some(ChangeKind::Deleted));
    assert_eq!(changes.get("dir/new.md"), Some(ChangeKind::Added));
    assert_eq!(changes.get("keep.md"), None);
}

#[test]
fn test_identical_rewrite_is_not_a_change() {
    let (_temp, _remote, work) = clone_fixture(&[("same.md", "same")]);
    fs::write(work.root().to_native().join("same.md"), "same").unwrap();

    work.stage_all().unwrap();
    assert!(work.diff_against_head().unwrap().is_empty());
}

#[test]
fn test_gitignored_files_are_not_staged() {
    let (_temp, _remote, work) = clone_fixture(&[(".gitignore", "*.log\n")]);
    fs::write(work.root().to_native().join("debug.log"), "noise").unwrap();

    assert!(work.is_path_ignored("debug.log").unwrap());
    assert!(!work.is_path_ignored("notes.md").unwrap());

    work.stage_all().unwrap();
    assert!(work.diff_against_head().unwrap().is_empty());
}

#[test]
fn test_commit_and_push_reach_remote() {
    let (_temp, remote, work) = clone_fixture(&[("README.md", "# hi")]);
    fs::write(work.root().to_native().join("new.md"), "content").unwrap();

    work.stage_all().unwrap();
    work.commit("S3 updated", &author()).unwrap();
    work.push("origin").unwrap();

    assert_eq!(commit_count(&remote), 2);
    assert_eq!(tree_files(&remote), vec!["README.md", "new.md"]);
    assert_eq!(file_content(&remote, "new.md").as_deref(), Some("content"));

    let (summary, name, email) = head_commit_summary(&remote).unwrap();
    assert_eq!(summary, "S3 updated");
    assert_eq!(name, "Mirror Bot");
    assert_eq!(email, "mirror@example.com");
}

#[test]
fn test_first_commit_into_empty_remote() {
    let temp = TempDir::new().unwrap();
    let remote = temp.path().join("remote.git");
    let url = empty_bare_remote(&remote);
    let work =
        WorkingCopy::clone(&url, &temp.path().join("work"), &CloneOptions::default()).unwrap();

    fs::write(work.root().to_native().join("first.md"), "1").unwrap();
    work.stage_all().unwrap();

    let changes = work.diff_against_head().unwrap();
    assert_eq!(changes.get("first.md"), Some(ChangeKind::Added));

    work.commit("S3 updated", &author()).unwrap();
    work.push("origin").unwrap();
    assert_eq!(tree_files(&remote), vec!["first.md"]);
}

#[test]
fn test_push_to_missing_remote_name() {
    let (_temp, _remote, work) = clone_fixture(&[("README.md", "# hi")]);
    let err = work.push("upstream").unwrap_err();
    assert!(err.to_string().contains("Remote 'upstream' not found"));
}

#[test]
fn test_non_fast_forward_push_is_rejected() {
    let temp = TempDir::new().unwrap();
    let remote = temp.path().join("remote.git");
    let url = bare_remote_with_files(&remote, &[("README.md", "# hi")]);

    let first = WorkingCopy::clone(&url, &temp.path().join("one"), &CloneOptions::default()).unwrap();
    let second =
        WorkingCopy::clone(&url, &temp.path().join("two"), &CloneOptions::default()).unwrap();

    fs::write(first.root().to_native().join("a.md"), "a").unwrap();
    first.stage_all().unwrap();
    first.commit("first", &author()).unwrap();
    first.push("origin").unwrap();

    fs::write(second.root().to_native().join("b.md"), "b").unwrap();
    second.stage_all().unwrap();
    second.commit("second", &author()).unwrap();
    let err = second.push("origin").unwrap_err();

    assert!(
        matches!(err, Error::PushRejected { .. } | Error::PushFailed { .. }),
        "expected a push failure, got {err:?}"
    );
    assert_eq!(commit_count(&remote), 2);
}

#[test]
fn test_commit_lands_on_top_of_cloned_history() {
    let (_temp, _remote, work) = clone_fixture(&[("README.md", "# hi")]);
    fs::write(work.root().to_native().join("x.md"), "x").unwrap();
    work.stage_all().unwrap();
    work.commit("S3 updated", &author()).unwrap();

    let log = commit_log(&work.root().to_native());
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].summary, "S3 updated");
    assert_eq!(log[0].email, "mirror@example.com");
    assert_eq!(log[1].summary, "Initial commit");
}

#[test]
fn test_set_config_persists() {
    let (_temp, _remote, work) = clone_fixture(&[("README.md", "# hi")]);
    work.set_config("http.postBuffer", "52428800").unwrap();

    let repo = git2::Repository::open(work.root().to_native()).unwrap();
    let value = repo.config().unwrap().get_string("http.postBuffer").unwrap();
    assert_eq!(value, "52428800");
}
