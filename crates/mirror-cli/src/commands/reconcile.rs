//! Reconcile command implementation

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;

use mirror_core::{FetchAction, MirrorConfig, ObjectStore, Outcome, ReconcileContext, ReconcileReport};
use mirror_fs::NormalizedPath;
use mirror_store::DirectoryStore;

use super::environment_settings;
use crate::cli::ReconcileArgs;
use crate::error::Result;

/// Run one reconciliation of `args.bucket` and print its report.
pub fn run_reconcile(args: &ReconcileArgs) -> Result<()> {
    let store = DirectoryStore::new(&args.store_root);

    let config = match &args.config {
        Some(path) => MirrorConfig::load(&NormalizedPath::new(path))?,
        None => ReconcileContext::resolve_config(&store, &args.bucket, &environment_settings())?,
    };
    tracing::debug!(origin = %config.origin_url, digest = %config.digest, "Resolved configuration");

    let workdir = args
        .workdir
        .clone()
        .unwrap_or_else(|| default_workdir(&args.bucket));
    let store: Arc<dyn ObjectStore> = Arc::new(store.with_algorithm(config.digest));
    let context = ReconcileContext::new(config, store, workdir).keep_workdir(args.keep_workdir);

    let report = context.reconcile(&args.bucket)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn default_workdir(bucket: &str) -> PathBuf {
    std::env::temp_dir().join(format!("bucket-mirror-{bucket}"))
}

fn print_report(report: &ReconcileReport) {
    match &report.outcome {
        Outcome::Committed { commit, changed } => {
            let short = &commit[..commit.len().min(7)];
            println!(
                "{} {} at {} ({} paths changed)",
                "Committed".green().bold(),
                report.bucket.cyan(),
                short.yellow(),
                changed.len()
            );
        }
        Outcome::NoChanges => {
            println!(
                "{} {} is already in sync.",
                "OK".green().bold(),
                report.bucket.cyan()
            );
        }
    }

    for outcome in &report.fetched {
        if let FetchAction::Downloaded { bytes } = outcome.action {
            println!("  {} {} ({bytes} bytes)", "+".green(), outcome.key);
        }
    }
    for path in &report.deleted {
        println!("  {} {}", "-".red(), path);
    }
    for key in &report.oversized {
        println!("  {} {} (over size ceiling)", "~".yellow(), key);
    }

    if !report.errors.is_empty() {
        println!();
        println!("{}", "Errors:".red().bold());
        for error in &report.errors {
            println!("  {} {}", "x".red(), error);
        }
    }
}
