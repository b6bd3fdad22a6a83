//! Reconciliation engine for bucket-mirror
//!
//! Mirrors the current contents of an object-storage bucket into a git
//! working tree and commits only when content actually changed.
//!
//! # Architecture
//!
//! ```text
//!                  mirror-cli
//!                      |
//!                 mirror-core
//!                      |
//!        +-------------+-------------+
//!        |             |             |
//!    mirror-fs     mirror-git    mirror-store
//! ```
//!
//! One invocation flows through the engine as:
//!
//! 1. [`plan`]: enumerate the local tree and the bucket listing, derive the
//!    fetch tasks and delete candidates, drop oversized objects.
//! 2. [`executor`]: fetch VCS ignore files first, snapshot the ignore rules,
//!    then compare digests and download changed objects on a bounded worker
//!    pool. Every task finishes before the next phase.
//! 3. [`delete`]: remove local files that vanished remotely, unless an
//!    ignore rule or the hidden-path policy protects them.
//! 4. [`gate`]: stage everything, diff against HEAD, and commit + push only
//!    when the diff is non-empty.

pub mod config;
pub mod delete;
pub mod digest;
pub mod error;
pub mod executor;
pub mod gate;
pub mod ignore;
pub mod plan;
pub mod reconcile;
pub mod tree;

pub use config::{MirrorConfig, Settings};
pub use delete::{DeletePolicy, DeleteReport};
pub use digest::DigestComparator;
pub use error::{Error, FailureCause, Result};
pub use executor::{FetchAction, FetchExecutor, FetchOutcome};
pub use gate::{ChangeGate, GateDecision};
pub use ignore::{IgnoreDecision, IgnoreFilter, IgnoreRules, VcsIgnoreSnapshot};
pub use plan::{FetchTask, LocalEntry, Planner, ReconciliationPlan};
pub use reconcile::{Outcome, ReconcileContext, ReconcileReport, Reconciler};
pub use tree::WorkingTree;

pub use mirror_git::{Author, ChangeKind, ChangeSet};
pub use mirror_store::{ObjectStore, RemoteObject};
