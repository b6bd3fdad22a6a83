//! Scenario tests for production bucket shapes
//!
//! Each module covers one family of behaviour a deployed mirror relies on,
//! running the full engine against a real git remote and an in-memory bucket.

use std::sync::Arc;

use mirror_core::{FetchAction, MirrorConfig, ObjectStore, Outcome, ReconcileContext, ReconcileReport};
use mirror_fs::DigestAlgorithm;
use mirror_store::MemoryStore;
use mirror_test_utils::git::{bare_remote_with_files, commit_count, file_content, tree_files};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

// =============================================================================
// Test Infrastructure
// =============================================================================

const BUCKET: &str = "vault";

/// A bare remote seeded with files plus a bucket to mirror into it
pub struct Mission {
    temp: TempDir,
    remote: std::path::PathBuf,
    url: String,
    store: Arc<MemoryStore>,
}

impl Mission {
    pub fn new(git_files: &[(&str, &str)]) -> Self {
        Self::with_store(git_files, MemoryStore::new())
    }

    pub fn with_store(git_files: &[(&str, &str)], store: MemoryStore) -> Self {
        let temp = TempDir::new().unwrap();
        let remote = temp.path().join("remote.git");
        let url = bare_remote_with_files(&remote, git_files);
        store.create_bucket(BUCKET);
        Self {
            temp,
            remote,
            url,
            store: Arc::new(store),
        }
    }

    pub fn put(&self, key: &str, content: &str) -> &Self {
        self.store.put(BUCKET, key, content.as_bytes());
        self
    }

    pub fn config(&self) -> MirrorConfig {
        let mut config = MirrorConfig::new(&self.url, "Mirror Bot", "mirror@example.com");
        config.concurrency = Some(8);
        config
    }

    pub fn reconcile(&self) -> ReconcileReport {
        self.reconcile_with(self.config())
    }

    pub fn reconcile_with(&self, config: MirrorConfig) -> ReconcileReport {
        let store: Arc<dyn ObjectStore> = self.store.clone();
        ReconcileContext::new(config, store, self.temp.path().join("work"))
            .reconcile(BUCKET)
            .unwrap()
    }

    pub fn action_of<'r>(&self, report: &'r ReconcileReport, key: &str) -> &'r FetchAction {
        &report
            .fetched
            .iter()
            .find(|o| o.key == key)
            .unwrap_or_else(|| panic!("no fetch outcome for {key}"))
            .action
    }
}

// =============================================================================
// Mission 1: VCS ignore rules
// =============================================================================

mod m1_vcs_ignore {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn gitignored_keys_are_never_fetched() {
        let mission = Mission::new(&[(".gitignore", "*.log\nbuild/\n")]);
        mission
            .put("notes.md", "n")
            .put("debug.log", "noise")
            .put("build/out.bin", "binary");

        let report = mission.reconcile();

        assert_eq!(mission.action_of(&report, "debug.log"), &FetchAction::SkippedIgnored);
        assert_eq!(mission.action_of(&report, "build/out.bin"), &FetchAction::SkippedIgnored);
        assert_eq!(tree_files(&mission.remote), vec![".gitignore", "notes.md"]);
    }

    #[test]
    fn both_rule_sources_apply_together() {
        let mission = Mission::new(&[(".gitignore", "*.log\n")]);
        mission
            .put(".s3gitignore", "drafts/\n")
            .put("drafts/a.md", "d")
            .put("x.log", "l")
            .put("keep.md", "k");

        let report = mission.reconcile();

        assert_eq!(mission.action_of(&report, "drafts/a.md"), &FetchAction::SkippedIgnored);
        assert_eq!(mission.action_of(&report, "x.log"), &FetchAction::SkippedIgnored);
        assert_eq!(
            tree_files(&mission.remote),
            vec![".gitignore", ".s3gitignore", "keep.md"]
        );
    }

    #[test]
    fn gitignored_paths_survive_the_delete_phase() {
        let mission = Mission::new(&[
            (".gitignore", "build/\n"),
            ("build/x.bin", "tracked anyway"),
            ("keep.md", "k"),
        ]);
        mission.put("keep.md", "k");

        let report = mission.reconcile();

        assert!(report.deleted.is_empty());
        assert_eq!(
            report.protected,
            vec![".gitignore".to_string(), "build/x.bin".to_string()]
        );
        assert_eq!(report.outcome, Outcome::NoChanges);
        assert_eq!(
            tree_files(&mission.remote),
            vec![".gitignore", "build/x.bin", "keep.md"]
        );
    }
}

// =============================================================================
// Mission 2: Content tags
// =============================================================================

mod m2_content_tags {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn multipart_tags_redownload_but_do_not_commit() {
        let mission = Mission::new(&[("video.bin", "same bytes")]);
        mission.store.put_with_tag(
            BUCKET,
            "video.bin",
            "same bytes",
            "\"d41d8cd98f00b204e9800998ecf8427e-3\"",
        );

        let report = mission.reconcile();

        assert!(matches!(
            mission.action_of(&report, "video.bin"),
            FetchAction::Downloaded { .. }
        ));
        assert_eq!(report.outcome, Outcome::NoChanges);
        assert_eq!(commit_count(&mission.remote), 1);
    }

    #[test]
    fn sha256_tagged_store_short_circuits() {
        let mission = Mission::with_store(
            &[("a.txt", "alpha")],
            MemoryStore::with_algorithm(DigestAlgorithm::Sha256),
        );
        mission.put("a.txt", "alpha");
        let mut config = mission.config();
        config.digest = DigestAlgorithm::Sha256;

        let report = mission.reconcile_with(config);

        assert_eq!(mission.action_of(&report, "a.txt"), &FetchAction::SkippedUnchanged);
        assert_eq!(mission.store.stats().downloads, 0);
    }
}

// =============================================================================
// Mission 3: Listing shapes
// =============================================================================

mod m3_listing_shapes {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn directory_markers_are_not_materialized() {
        let mission = Mission::new(&[("README.md", "r")]);
        mission.put("README.md", "r");
        mission.store.put(BUCKET, "photos/", Vec::new());
        mission.put("photos/cat.jpg", "meow");

        let report = mission.reconcile();

        assert!(report.fetched.iter().all(|o| o.key != "photos/"));
        assert_eq!(tree_files(&mission.remote), vec!["README.md", "photos/cat.jpg"]);
    }

    #[test]
    fn unsafe_keys_fail_without_blocking_siblings() {
        let mission = Mission::new(&[("README.md", "r")]);
        mission
            .put("README.md", "r")
            .put("../outside.txt", "escape")
            .put(".git/hooks/post-commit", "#!/bin/sh")
            .put("inside.txt", "ok");

        let report = mission.reconcile();

        assert_eq!(report.errors.len(), 2);
        assert!(report.committed());
        assert_eq!(tree_files(&mission.remote), vec!["README.md", "inside.txt"]);
        assert!(!mission.temp.path().join("outside.txt").exists());
    }

    #[test]
    fn unicode_and_deeply_nested_keys() {
        let mission = Mission::new(&[("README.md", "r")]);
        mission
            .put("README.md", "r")
            .put("notes/日本語/メモ.md", "memo")
            .put("a/b/c/d/e/f/g/h.txt", "deep")
            .put("with space/émoji 🎉.md", "party");

        let report = mission.reconcile();

        assert!(report.errors.is_empty());
        assert_eq!(
            file_content(&mission.remote, "notes/日本語/メモ.md").as_deref(),
            Some("memo")
        );
        assert_eq!(
            file_content(&mission.remote, "with space/émoji 🎉.md").as_deref(),
            Some("party")
        );
        assert_eq!(file_content(&mission.remote, "a/b/c/d/e/f/g/h.txt").as_deref(), Some("deep"));
    }
}

// =============================================================================
// Mission 4: Volume and concurrency
// =============================================================================

mod m4_volume {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn many_objects_share_directories_across_workers() {
        let mission = Mission::new(&[("README.md", "r")]);
        mission.put("README.md", "r");
        for i in 0..300 {
            mission.put(&format!("shared/{}/{i}.md", i % 7), &format!("note {i}"));
        }

        let report = mission.reconcile();

        assert_eq!(report.downloaded().count(), 300);
        assert!(report.errors.is_empty());
        assert_eq!(tree_files(&mission.remote).len(), 301);

        mission.store.reset_stats();
        let again = mission.reconcile();
        assert_eq!(again.outcome, Outcome::NoChanges);
        assert_eq!(mission.store.stats().downloads, 0);
    }

    #[test]
    fn single_worker_gives_the_same_result() {
        let mission = Mission::new(&[("old.md", "o")]);
        for i in 0..20 {
            mission.put(&format!("n/{i}.md"), "x");
        }
        let mut config = mission.config();
        config.concurrency = Some(1);

        let report = mission.reconcile_with(config);

        assert_eq!(report.downloaded().count(), 20);
        assert_eq!(report.deleted, vec!["old.md".to_string()]);
    }
}

// =============================================================================
// Mission 5: Configuration
// =============================================================================

mod m5_configuration {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn custom_ignore_document_key() {
        let mission = Mission::new(&[("README.md", "r")]);
        mission
            .put("README.md", "r")
            .put(".mirrorignore", "tmp/\n")
            .put("tmp/scratch.md", "s");
        let mut config = mission.config();
        config.ignore_document_key = ".mirrorignore".into();

        let report = mission.reconcile_with(config);

        assert_eq!(mission.action_of(&report, "tmp/scratch.md"), &FetchAction::SkippedIgnored);
    }

    #[test]
    fn custom_commit_message_and_remote_name() {
        let mission = Mission::new(&[("README.md", "r")]);
        mission.put("README.md", "r").put("new.md", "n");
        let mut config = mission.config();
        config.commit_message = "Nightly bucket snapshot".into();

        mission.reconcile_with(config.clone());
        assert_eq!(
            mirror_test_utils::git::head_commit_summary(&mission.remote).map(|(s, _, _)| s),
            Some("Nightly bucket snapshot".to_string())
        );

        mission.put("other.md", "o");
        config.remote = "upstream".into();
        let store: Arc<dyn ObjectStore> = mission.store.clone();
        let err = ReconcileContext::new(config, store, mission.temp.path().join("work"))
            .reconcile(BUCKET)
            .unwrap_err();
        assert!(matches!(err, mirror_core::Error::Push { .. }));
    }

    #[test]
    fn empty_allowlist_protects_every_hidden_path() {
        let mission = Mission::new(&[(".obsidian/workspace.json", "{}"), ("a.md", "a")]);
        mission.put("a.md", "a");
        let mut config = mission.config();
        config.hidden_allowlist.clear();

        let report = mission.reconcile_with(config);

        assert!(report.deleted.is_empty());
        assert_eq!(report.protected, vec![".obsidian/workspace.json".to_string()]);
    }
}
