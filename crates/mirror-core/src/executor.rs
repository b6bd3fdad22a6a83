//! Concurrent fetch phase
//!
//! Every fetch task is compared against the local file and downloaded only
//! when the content differs. Tasks run on a dedicated rayon pool sized to the
//! configured worker count; [`FetchExecutor::execute`] returns after the last
//! task finishes, which is the barrier the delete and commit phases rely on.

use std::time::Instant;

use mirror_fs::{NormalizedPath, io, validate_object_key};
use mirror_store::ObjectStore;
use rayon::prelude::*;
use serde::Serialize;

use crate::digest::DigestComparator;
use crate::ignore::IgnoreFilter;
use crate::plan::FetchTask;
use crate::Result;

/// What happened to one fetch task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum FetchAction {
    /// Local content already matches the remote tag
    SkippedUnchanged,
    /// An ignore rule protects the path
    SkippedIgnored,
    /// The object was written into the tree
    Downloaded { bytes: u64 },
    /// The key was unusable or the download failed; the local path is untouched
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchOutcome {
    pub key: String,
    #[serde(flatten)]
    pub action: FetchAction,
}

impl FetchOutcome {
    fn new(key: impl Into<String>, action: FetchAction) -> Self {
        Self {
            key: key.into(),
            action,
        }
    }

    pub fn is_downloaded(&self) -> bool {
        matches!(self.action, FetchAction::Downloaded { .. })
    }

    pub fn failure(&self) -> Option<&str> {
        match &self.action {
            FetchAction::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Runs fetch tasks against one bucket and one tree root.
pub struct FetchExecutor<'a> {
    store: &'a dyn ObjectStore,
    bucket: &'a str,
    root: &'a NormalizedPath,
    comparator: DigestComparator,
    filter: IgnoreFilter<'a>,
    concurrency: usize,
}

impl<'a> FetchExecutor<'a> {
    pub fn new(store: &'a dyn ObjectStore, bucket: &'a str, root: &'a NormalizedPath) -> Self {
        Self {
            store,
            bucket,
            root,
            comparator: DigestComparator::default(),
            filter: IgnoreFilter::none(),
            concurrency: 1,
        }
    }

    pub fn with_comparator(mut self, comparator: DigestComparator) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn with_filter(mut self, filter: IgnoreFilter<'a>) -> Self {
        self.filter = filter;
        self
    }

    /// Worker count; values below 1 are raised to 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Run every task to completion and return one outcome per task, sorted by key.
    pub fn execute(&self, tasks: Vec<FetchTask>) -> Result<Vec<FetchOutcome>> {
        let started = Instant::now();
        let submitted = tasks.len();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|i| format!("fetch-{i}"))
            .build()?;

        let mut outcomes: Vec<FetchOutcome> =
            pool.install(|| tasks.into_par_iter().map(|task| self.run(task)).collect());
        outcomes.sort_by(|a, b| a.key.cmp(&b.key));

        let downloaded = outcomes.iter().filter(|o| o.is_downloaded()).count();
        let failed = outcomes.iter().filter(|o| o.failure().is_some()).count();
        tracing::info!(
            bucket = %self.bucket,
            tasks = submitted,
            downloaded,
            failed,
            workers = self.concurrency,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetch phase complete"
        );

        Ok(outcomes)
    }

    fn run(&self, task: FetchTask) -> FetchOutcome {
        let action = self.fetch(&task);
        match &action {
            FetchAction::Failed { reason } => {
                tracing::warn!(key = %task.key, reason = %reason, "Fetch failed");
            }
            action => tracing::debug!(key = %task.key, ?action, "Fetch task done"),
        }
        FetchOutcome::new(task.key, action)
    }

    fn fetch(&self, task: &FetchTask) -> FetchAction {
        if let Err(e) = validate_object_key(&task.key) {
            return FetchAction::Failed {
                reason: e.to_string(),
            };
        }

        if self.filter.is_ignored(&task.key) {
            return FetchAction::SkippedIgnored;
        }

        let destination = self.root.join(&task.key);
        let native = destination.to_native();

        if let Err(e) = io::ensure_parent_dir(&native) {
            return FetchAction::Failed {
                reason: e.to_string(),
            };
        }

        if !self.comparator.needs_fetch(task, &native) {
            return FetchAction::SkippedUnchanged;
        }

        let mut reader = match self.store.download_object(self.bucket, &task.key) {
            Ok(reader) => reader,
            Err(e) => {
                return FetchAction::Failed {
                    reason: e.to_string(),
                };
            }
        };

        match io::write_atomic_from_reader(&destination, &mut reader) {
            Ok(bytes) => FetchAction::Downloaded { bytes },
            Err(e) => FetchAction::Failed {
                reason: e.to_string(),
            },
        }
    }
}
