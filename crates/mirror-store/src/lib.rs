//! Object-store client abstraction for bucket-mirror
//!
//! The reconciliation engine only needs three calls from a store: list a
//! bucket, stream one object, and fetch an optional small document. The
//! [`ObjectStore`] trait captures exactly that; transport and retry policy
//! belong to the implementation.

pub mod directory;
pub mod error;
pub mod memory;
pub mod object;

pub use directory::DirectoryStore;
pub use error::{Error, Result};
pub use memory::{MemoryStore, MemoryStoreStats};
pub use object::RemoteObject;

use std::io::Read;

/// Read-only view of an object store.
///
/// Implementations must be shareable across fetch worker threads.
pub trait ObjectStore: Send + Sync {
    /// List every object currently in `bucket`.
    fn list_objects(&self, bucket: &str) -> Result<Vec<RemoteObject>>;

    /// Open a stream over the current bytes of `key`.
    fn download_object(&self, bucket: &str, key: &str) -> Result<Box<dyn Read + Send>>;

    /// Fetch a small object, returning `None` when it does not exist.
    fn fetch_optional_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>>;
}
