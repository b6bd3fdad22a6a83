//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// bucket-mirror - Mirror an object-storage bucket into a git repository
#[derive(Parser, Debug)]
#[command(name = "bucket-mirror")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Mirror a bucket into its git repository and push
    ///
    /// Clones the repository named by the bucket's settings document (or the
    /// --config file), fetches changed objects, deletes vanished files and
    /// commits only when content changed.
    ///
    /// Examples:
    ///   bucket-mirror reconcile vault --store-root /srv/buckets
    ///   bucket-mirror reconcile vault --store-root /srv/buckets --config mirror.toml
    ///   bucket-mirror reconcile vault --store-root /srv/buckets --json
    Reconcile(ReconcileArgs),

    /// Preview what a reconciliation would change in a local tree
    ///
    /// Read-only: nothing is downloaded, deleted or committed.
    Plan(PlanArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ReconcileArgs {
    /// Bucket to mirror
    pub bucket: String,

    /// Directory whose subdirectories are buckets
    #[arg(long, env = "BUCKET_MIRROR_STORE_ROOT")]
    pub store_root: PathBuf,

    /// Where to clone the working copy (replaced on every run)
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// TOML or JSON configuration file instead of the bucket's settings document
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Keep the working copy after the run
    #[arg(long)]
    pub keep_workdir: bool,

    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PlanArgs {
    /// Bucket to compare against
    pub bucket: String,

    /// Directory whose subdirectories are buckets
    #[arg(long, env = "BUCKET_MIRROR_STORE_ROOT")]
    pub store_root: PathBuf,

    /// Local working tree to compare
    #[arg(long)]
    pub tree: PathBuf,

    /// TOML or JSON configuration file instead of the bucket's settings document
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Largest object size in bytes to consider, overriding the configuration
    #[arg(long)]
    pub size_ceiling: Option<u64>,

    /// Output the preview as JSON
    #[arg(long)]
    pub json: bool,
}
