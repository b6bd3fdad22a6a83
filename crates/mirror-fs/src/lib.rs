//! Filesystem primitives for bucket-mirror
//!
//! Provides normalized relative paths, object-key validation, atomic writes
//! and content digests shared by the store and the reconciliation engine.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use checksum::DigestAlgorithm;
pub use config::ConfigStore;
pub use error::{Error, Result};
pub use path::{NormalizedPath, is_hidden, validate_object_key};
