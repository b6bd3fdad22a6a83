//! Git working-copy operations for bucket-mirror
//!
//! Wraps `git2` with the handful of operations the mirror needs: a shallow
//! clone, ignore-rule lookups, staging every change, diffing the index
//! against HEAD, committing and pushing with rejection reporting.

pub mod changes;
pub mod error;
pub mod helpers;
pub mod working_copy;

pub use changes::{ChangeKind, ChangeSet};
pub use error::{Error, Result};
pub use working_copy::{Author, CloneOptions, WorkingCopy};
