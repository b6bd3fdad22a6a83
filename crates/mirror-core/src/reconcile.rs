//! One reconciliation invocation, end to end
//!
//! [`Reconciler`] runs the engine against an already prepared working tree.
//! [`ReconcileContext`] owns everything one invocation needs (configuration,
//! store client, clone directory) and provisions the working copy around it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use mirror_git::{CloneOptions, WorkingCopy};
use mirror_store::ObjectStore;
use serde::Serialize;

use crate::config::{MirrorConfig, SETTINGS_DOCUMENT_KEY, Settings};
use crate::delete::{DeletePolicy, apply_deletions};
use crate::digest::DigestComparator;
use crate::executor::{FetchExecutor, FetchOutcome};
use crate::gate::{ChangeGate, GateDecision};
use crate::ignore::{IgnoreFilter, IgnoreRules, VcsIgnoreSnapshot, is_vcs_rule_file};
use crate::plan::{FetchTask, Planner, enumerate_local_tree};
use crate::tree::WorkingTree;
use crate::{Error, Result};

/// `http.postBuffer` applied to fresh clones so large pushes go through.
pub const HTTP_POST_BUFFER: &str = "52428800";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    NoChanges,
    Committed { commit: String, changed: Vec<String> },
}

/// Summary of one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub bucket: String,
    pub outcome: Outcome,
    /// One entry per fetch task, sorted by key
    pub fetched: Vec<FetchOutcome>,
    pub deleted: Vec<String>,
    /// Delete candidates kept by an ignore rule or the hidden-path policy
    pub protected: Vec<String>,
    pub oversized: Vec<String>,
    /// Per-key failures that did not abort the invocation
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ReconcileReport {
    pub fn committed(&self) -> bool {
        matches!(self.outcome, Outcome::Committed { .. })
    }

    pub fn commit_id(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Committed { commit, .. } => Some(commit),
            Outcome::NoChanges => None,
        }
    }

    pub fn downloaded(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.fetched.iter().filter(|o| o.is_downloaded())
    }
}

/// Fetch and compile the bucket's custom ignore document.
///
/// Absent, unreadable and non-UTF-8 documents all yield `None`.
pub fn load_ignore_rules(store: &dyn ObjectStore, bucket: &str, key: &str) -> Option<IgnoreRules> {
    match store.fetch_optional_object(bucket, key) {
        Ok(Some(bytes)) => match String::from_utf8(bytes) {
            Ok(text) => {
                let rules = IgnoreRules::parse(&text);
                tracing::debug!(key = %key, rules = rules.len(), "Loaded custom ignore rules");
                Some(rules)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Ignore document is not UTF-8, ignoring it");
                None
            }
        },
        Ok(None) => {
            tracing::debug!(key = %key, "No custom ignore document");
            None
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Ignore document unavailable, ignoring it");
            None
        }
    }
}

/// Fetch and parse the bucket's settings document.
///
/// An absent document yields empty settings; an unreadable one is a
/// configuration error.
pub fn read_settings_document(store: &dyn ObjectStore, bucket: &str) -> Result<Settings> {
    match store.fetch_optional_object(bucket, SETTINGS_DOCUMENT_KEY) {
        Ok(Some(bytes)) => {
            let text = String::from_utf8(bytes)
                .map_err(|_| Error::config(format!("{SETTINGS_DOCUMENT_KEY} is not valid UTF-8")))?;
            Ok(Settings::parse_dotenv(&text))
        }
        Ok(None) => {
            tracing::debug!(bucket = %bucket, "No settings document in bucket");
            Ok(Settings::new())
        }
        Err(e) => Err(Error::config(format!(
            "failed to read {SETTINGS_DOCUMENT_KEY} from '{bucket}': {e}"
        ))),
    }
}

/// Runs the engine against one bucket and one working tree.
pub struct Reconciler<'a> {
    store: &'a dyn ObjectStore,
    config: &'a MirrorConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn ObjectStore, config: &'a MirrorConfig) -> Self {
        Self { store, config }
    }

    pub fn run(&self, bucket: &str, tree: &dyn WorkingTree) -> Result<ReconcileReport> {
        let started_at = Utc::now();
        let started = Instant::now();
        let config = self.config;

        let custom_rules = load_ignore_rules(self.store, bucket, &config.ignore_document_key);

        let remote = self
            .store
            .list_objects(bucket)
            .map_err(|source| Error::Listing {
                bucket: bucket.to_string(),
                source,
            })?;
        let local = enumerate_local_tree(&tree.root().to_native())?;

        let plan = Planner::new(config.size_ceiling).plan(&local, &remote);
        tracing::info!(
            bucket = %bucket,
            remote = remote.len(),
            local = local.len(),
            to_fetch = plan.to_fetch.len(),
            to_delete = plan.to_delete.len(),
            oversized = plan.oversized.len(),
            "Planned reconciliation"
        );
        for key in &plan.oversized {
            tracing::warn!(key = %key, ceiling = config.size_ceiling, "Skipping object over size ceiling");
        }

        // Rule files land first and serially; every other decision is then
        // taken against the rules git will stage with.
        let (rule_tasks, content_tasks): (Vec<FetchTask>, Vec<FetchTask>) = plan
            .to_fetch
            .into_iter()
            .partition(|task| is_vcs_rule_file(&task.key));

        let mut fetched = Vec::with_capacity(rule_tasks.len() + content_tasks.len());
        if !rule_tasks.is_empty() {
            let snapshot =
                VcsIgnoreSnapshot::capture(tree, rule_tasks.iter().map(|t| t.key.as_str()));
            let filter = IgnoreFilter::new(Some(&snapshot), custom_rules.as_ref());
            fetched.extend(
                self.executor(bucket, tree, filter)
                    .with_concurrency(1)
                    .execute(rule_tasks)?,
            );
        }

        let snapshot = VcsIgnoreSnapshot::capture(
            tree,
            content_tasks
                .iter()
                .map(|t| t.key.as_str())
                .chain(plan.to_delete.iter().map(String::as_str)),
        );
        let filter = IgnoreFilter::new(Some(&snapshot), custom_rules.as_ref());
        fetched.extend(self.executor(bucket, tree, filter).execute(content_tasks)?);
        fetched.sort_by(|a, b| a.key.cmp(&b.key));

        let deletions = apply_deletions(
            tree.root(),
            &plan.to_delete,
            &filter,
            &DeletePolicy::new(config.hidden_allowlist.iter().cloned()),
        );

        let mut errors: Vec<String> = fetched
            .iter()
            .filter_map(|o| o.failure().map(|reason| format!("{}: {reason}", o.key)))
            .collect();
        errors.extend(
            deletions
                .failed
                .iter()
                .map(|(path, reason)| format!("delete {path}: {reason}")),
        );

        let outcome = match ChangeGate.should_commit(tree)? {
            GateDecision::NoChanges => Outcome::NoChanges,
            GateDecision::Commit(changes) => {
                let commit = tree
                    .commit(&config.commit_message, &config.author())
                    .map_err(Error::Commit)?;
                tree.push(&config.remote).map_err(|source| Error::Push {
                    commit: commit.clone(),
                    source,
                })?;
                tracing::info!(commit = %commit, remote = %config.remote, "Pushed");
                Outcome::Committed {
                    commit,
                    changed: changes.changed_paths().map(String::from).collect(),
                }
            }
        };

        tracing::info!(
            bucket = %bucket,
            committed = matches!(outcome, Outcome::Committed { .. }),
            errors = errors.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Reconciliation finished"
        );

        Ok(ReconcileReport {
            bucket: bucket.to_string(),
            outcome,
            fetched,
            deleted: deletions.deleted,
            protected: deletions.protected,
            oversized: plan.oversized,
            errors,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn executor<'e>(
        &'e self,
        bucket: &'e str,
        tree: &'e dyn WorkingTree,
        filter: IgnoreFilter<'e>,
    ) -> FetchExecutor<'e> {
        FetchExecutor::new(self.store, bucket, tree.root())
            .with_comparator(DigestComparator::new(self.config.digest))
            .with_filter(filter)
            .with_concurrency(self.config.worker_count())
    }
}

/// Everything one invocation needs, built fresh per invocation.
pub struct ReconcileContext {
    config: MirrorConfig,
    store: Arc<dyn ObjectStore>,
    workdir: PathBuf,
    keep_workdir: bool,
}

impl std::fmt::Debug for ReconcileContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileContext")
            .field("workdir", &self.workdir)
            .field("keep_workdir", &self.keep_workdir)
            .finish_non_exhaustive()
    }
}

impl ReconcileContext {
    /// `workdir` is where the working copy is cloned; it is replaced on every run.
    pub fn new(config: MirrorConfig, store: Arc<dyn ObjectStore>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            store,
            workdir: workdir.into(),
            keep_workdir: false,
        }
    }

    /// Build a context whose configuration comes from the bucket's settings
    /// document, overridden by `env`.
    pub fn from_bucket(
        store: Arc<dyn ObjectStore>,
        bucket: &str,
        env: &Settings,
        workdir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let config = Self::resolve_config(store.as_ref(), bucket, env)?;
        Ok(Self::new(config, store, workdir))
    }

    /// Read the settings document from `bucket` and apply `env` on top.
    pub fn resolve_config(store: &dyn ObjectStore, bucket: &str, env: &Settings) -> Result<MirrorConfig> {
        let document = read_settings_document(store, bucket)?;
        let config = MirrorConfig::from_settings(&document.overridden_by(env))?;
        config.validate()?;
        Ok(config)
    }

    /// Keep the clone on disk after the run.
    pub fn keep_workdir(mut self, keep: bool) -> Self {
        self.keep_workdir = keep;
        self
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Clone a fresh working copy, reconcile `bucket` into it, and clean up.
    pub fn reconcile(&self, bucket: &str) -> Result<ReconcileReport> {
        let copy = self.provision()?;
        let result = self.reconcile_tree(bucket, &copy);
        drop(copy);

        if !self.keep_workdir
            && let Err(e) = std::fs::remove_dir_all(&self.workdir)
        {
            tracing::warn!(path = %self.workdir.display(), error = %e, "Failed to remove working copy");
        }
        result
    }

    /// Reconcile `bucket` into an already prepared working tree.
    pub fn reconcile_tree(&self, bucket: &str, tree: &dyn WorkingTree) -> Result<ReconcileReport> {
        Reconciler::new(self.store.as_ref(), &self.config).run(bucket, tree)
    }

    fn provision(&self) -> Result<WorkingCopy> {
        if self.workdir.exists() {
            tracing::debug!(path = %self.workdir.display(), "Removing stale working copy");
            std::fs::remove_dir_all(&self.workdir)?;
        }
        if let Some(parent) = self.workdir.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = CloneOptions {
            depth: self.config.clone_depth,
            branch: None,
        };
        let copy =
            WorkingCopy::clone(&self.config.origin_url, &self.workdir, &options).map_err(Error::Clone)?;
        copy.set_config("http.postBuffer", HTTP_POST_BUFFER)
            .map_err(Error::Clone)?;
        Ok(copy)
    }
}
