//! Shared test utilities for the bucket-mirror workspace.
//!
//! A dev-dependency only; never published.
//!
//! # Modules
//!
//! - [`git`] - bare remotes with history and helpers to inspect them
//! - [`tree`] - [`TestTree`] for arranging and asserting on a working tree

pub mod git;
pub mod tree;
