//! Plan command implementation
//!
//! Previews a reconciliation against a local tree without touching it.

use colored::Colorize;
use serde::Serialize;

use mirror_core::plan::enumerate_local_tree;
use mirror_core::reconcile::{load_ignore_rules, read_settings_document};
use mirror_core::{
    DeletePolicy, DigestComparator, IgnoreFilter, MirrorConfig, ObjectStore, Planner,
    VcsIgnoreSnapshot,
};
use mirror_fs::{NormalizedPath, validate_object_key};
use mirror_git::WorkingCopy;
use mirror_store::DirectoryStore;

use super::environment_settings;
use crate::cli::PlanArgs;
use crate::error::{CliError, Result};

/// What a reconciliation would do, by category.
#[derive(Debug, Default, Serialize)]
pub struct Preview {
    pub download: Vec<String>,
    pub unchanged: Vec<String>,
    pub ignored: Vec<String>,
    /// `key: reason` for keys that cannot be written below the tree
    pub invalid: Vec<String>,
    pub delete: Vec<String>,
    pub protected: Vec<String>,
    pub oversized: Vec<String>,
}

impl Preview {
    pub fn has_changes(&self) -> bool {
        !self.download.is_empty() || !self.delete.is_empty()
    }
}

pub fn run_plan(args: &PlanArgs) -> Result<()> {
    if !args.tree.is_dir() {
        return Err(CliError::user(format!(
            "Tree {} is not a directory",
            args.tree.display()
        )));
    }

    let store = DirectoryStore::new(&args.store_root);
    let mut config = match &args.config {
        Some(path) => MirrorConfig::load(&NormalizedPath::new(path))?,
        None => {
            let settings =
                read_settings_document(&store, &args.bucket)?.overridden_by(&environment_settings());
            // A preview never clones, commits or pushes.
            MirrorConfig::new("", "", "").with_overrides(&settings)
        }
    };
    if let Some(ceiling) = args.size_ceiling {
        config.size_ceiling = ceiling;
    }

    let store = store.with_algorithm(config.digest);
    let preview = preview(&store, &args.bucket, &NormalizedPath::new(&args.tree), &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else {
        print_preview(&preview);
    }
    Ok(())
}

/// Classify every key and local path the way a reconciliation would.
///
/// VCS ignore rules are read from the tree as it is now; ignore files the
/// bucket would deliver are not applied.
pub fn preview(
    store: &dyn ObjectStore,
    bucket: &str,
    tree: &NormalizedPath,
    config: &MirrorConfig,
) -> Result<Preview> {
    let remote = store.list_objects(bucket)?;
    let local = enumerate_local_tree(&tree.to_native())?;
    let plan = Planner::new(config.size_ceiling).plan(&local, &remote);

    let rules = load_ignore_rules(store, bucket, &config.ignore_document_key);
    let snapshot = match WorkingCopy::open(&tree.to_native()) {
        Ok(copy) => VcsIgnoreSnapshot::capture(
            &copy,
            plan.fetch_keys().chain(plan.to_delete.iter().map(String::as_str)),
        ),
        Err(e) => {
            tracing::debug!(error = %e, "Tree is not a git working copy, skipping VCS ignore rules");
            VcsIgnoreSnapshot::default()
        }
    };
    let filter = IgnoreFilter::new(Some(&snapshot), rules.as_ref());
    let comparator = DigestComparator::new(config.digest);
    let policy = DeletePolicy::new(config.hidden_allowlist.iter().cloned());

    let mut preview = Preview {
        oversized: plan.oversized.clone(),
        ..Preview::default()
    };

    for task in &plan.to_fetch {
        if let Err(e) = validate_object_key(&task.key) {
            preview.invalid.push(format!("{}: {e}", task.key));
        } else if filter.is_ignored(&task.key) {
            preview.ignored.push(task.key.clone());
        } else if comparator.needs_fetch(task, &tree.join(&task.key).to_native()) {
            preview.download.push(task.key.clone());
        } else {
            preview.unchanged.push(task.key.clone());
        }
    }
    for path in &plan.to_delete {
        let orphaned = mirror_fs::io::is_partial_file(path);
        if !orphaned && (filter.is_ignored(path) || !policy.permits(path)) {
            preview.protected.push(path.clone());
        } else {
            preview.delete.push(path.clone());
        }
    }

    Ok(preview)
}

fn print_preview(preview: &Preview) {
    if !preview.has_changes() {
        println!("{} No changes needed.", "OK".green().bold());
    }

    for key in &preview.download {
        println!("  {} {}", "+".green(), key);
    }
    for path in &preview.delete {
        println!("  {} {}", "-".red(), path);
    }
    for key in &preview.oversized {
        println!("  {} {} (over size ceiling)", "~".yellow(), key);
    }
    for key in preview.ignored.iter().chain(&preview.protected) {
        println!("  {} {} (protected)", "=".dimmed(), key);
    }
    for entry in &preview.invalid {
        println!("  {} {} (invalid key)", "x".red(), entry);
    }
}
