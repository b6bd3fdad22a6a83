//! End-to-end integration test for the mirror lifecycle
//!
//! This test exercises the complete flow across several invocations:
//! directory-backed bucket -> settings document -> clone -> reconcile -> push.

use std::sync::Arc;

use mirror_core::{FetchAction, ObjectStore, Outcome, ReconcileContext, Settings};
use mirror_git::{CloneOptions, WorkingCopy};
use mirror_store::DirectoryStore;
use mirror_test_utils::git::{
    bare_remote_with_files, commit_count, commit_log, file_content, tree_files,
};
use mirror_test_utils::tree::TestTree;
use pretty_assertions::assert_eq;

const BUCKET: &str = "vault";

struct Lifecycle {
    buckets: TestTree,
    scratch: TestTree,
    remote: std::path::PathBuf,
}

impl Lifecycle {
    fn new() -> Self {
        let buckets = TestTree::new();
        let scratch = TestTree::new();
        let remote = scratch.path("remote.git");
        let url = bare_remote_with_files(&remote, &[(".gitignore", "*.log\n")]);

        buckets.write(
            &format!("{BUCKET}/.env.s3git"),
            format!("GIT_ORIGIN={url}\nUSERNAME=Mirror Bot\nEMAIL=mirror@example.com\nSIZE_CEILING=1000\n"),
        );

        Self {
            buckets,
            scratch,
            remote,
        }
    }

    fn put(&self, key: &str, content: &str) {
        self.buckets.write(&format!("{BUCKET}/{key}"), content);
    }

    fn remove(&self, key: &str) {
        std::fs::remove_file(self.buckets.path(&format!("{BUCKET}/{key}"))).unwrap();
    }

    fn reconcile(&self) -> mirror_core::ReconcileReport {
        let store: Arc<dyn ObjectStore> = Arc::new(DirectoryStore::new(self.buckets.root()));
        ReconcileContext::from_bucket(store, BUCKET, &Settings::new(), self.scratch.path("work"))
            .unwrap()
            .reconcile(BUCKET)
            .unwrap()
    }
}

#[test]
fn test_bucket_history_is_mirrored_commit_by_commit() {
    let lifecycle = Lifecycle::new();

    // 1. First sync on top of the seeded repository
    lifecycle.put("notes/a.md", "alpha");
    lifecycle.put("notes/b.md", "beta");
    let first = lifecycle.reconcile();
    assert!(first.committed());
    assert_eq!(
        tree_files(&lifecycle.remote),
        vec![".gitignore", "notes/a.md", "notes/b.md"]
    );

    // 2. Edit, delete, and introduce an ignore document
    lifecycle.put("notes/a.md", "alpha v2");
    lifecycle.remove("notes/b.md");
    lifecycle.put(".s3gitignore", "private/\n");
    lifecycle.put("private/secret.md", "do not mirror");
    let second = lifecycle.reconcile();

    match &second.outcome {
        Outcome::Committed { changed, .. } => assert_eq!(
            changed,
            &vec![
                ".s3gitignore".to_string(),
                "notes/a.md".to_string(),
                "notes/b.md".to_string(),
            ]
        ),
        Outcome::NoChanges => panic!("expected a commit"),
    }
    let secret = second
        .fetched
        .iter()
        .find(|o| o.key == "private/secret.md")
        .unwrap();
    assert_eq!(secret.action, FetchAction::SkippedIgnored);
    assert_eq!(file_content(&lifecycle.remote, "notes/a.md").as_deref(), Some("alpha v2"));
    assert_eq!(
        tree_files(&lifecycle.remote),
        vec![".gitignore", ".s3gitignore", "notes/a.md"]
    );

    // 3. Nothing changed in the bucket
    let third = lifecycle.reconcile();
    assert_eq!(third.outcome, Outcome::NoChanges);
    assert!(third.downloaded().next().is_none());

    // 4. An object grows past the size ceiling: the mirrored copy is frozen
    lifecycle.put("notes/a.md", &"x".repeat(2_000));
    let fourth = lifecycle.reconcile();
    assert_eq!(fourth.outcome, Outcome::NoChanges);
    assert_eq!(fourth.oversized, vec!["notes/a.md".to_string()]);
    assert_eq!(file_content(&lifecycle.remote, "notes/a.md").as_deref(), Some("alpha v2"));

    assert_eq!(commit_count(&lifecycle.remote), 3);
}

#[test]
fn test_mirrored_history_is_readable_by_a_fresh_clone() {
    let lifecycle = Lifecycle::new();
    lifecycle.put("a.txt", "one");
    lifecycle.reconcile();
    lifecycle.put("a.txt", "two");
    lifecycle.reconcile();

    let clone = WorkingCopy::clone(
        &lifecycle.remote.to_string_lossy(),
        &lifecycle.scratch.path("reader"),
        &CloneOptions::default(),
    )
    .unwrap();
    let commits = commit_log(&clone.root().to_native());

    assert_eq!(commits.len(), 3);
    let mirrored: Vec<_> = commits
        .iter()
        .filter(|c| c.summary == "S3 updated")
        .collect();
    assert_eq!(mirrored.len(), 2);
    assert!(mirrored.iter().all(|c| c.author == "Mirror Bot"));
    assert_eq!(
        std::fs::read_to_string(clone.root().to_native().join("a.txt")).unwrap(),
        "two"
    );
}

#[test]
fn test_report_serializes_for_the_trigger() {
    let lifecycle = Lifecycle::new();
    lifecycle.put("a.txt", "one");

    let report = lifecycle.reconcile();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["bucket"], "vault");
    assert_eq!(json["outcome"]["status"], "committed");
    assert_eq!(json["fetched"][0]["key"], "a.txt");
    assert_eq!(json["fetched"][0]["action"], "downloaded");
    assert!(json["errors"].as_array().unwrap().is_empty());
}
