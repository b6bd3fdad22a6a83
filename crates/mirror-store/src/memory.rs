//! In-memory object store
//!
//! Used by tests and dry runs. Supports failure injection and counts calls
//! so tests can assert how many downloads a reconciliation performed.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Cursor, Read};
use std::sync::{Mutex, MutexGuard, PoisonError};

use mirror_fs::DigestAlgorithm;
use mirror_fs::checksum::compute_content_digest;

use crate::object::quoted_tag;
use crate::{Error, ObjectStore, RemoteObject, Result};

/// Counters and contents stay usable after a panicking test thread.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    tag: String,
}

/// Call counters for a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStoreStats {
    /// Number of list operations.
    pub list_calls: u64,
    /// Number of object downloads (successful or not).
    pub downloads: u64,
    /// Number of optional-object fetches.
    pub optional_fetches: u64,
    /// Keys downloaded, in call order.
    pub downloaded_keys: Vec<String>,
}

/// Object store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    algorithm: DigestAlgorithm,
    buckets: Mutex<HashMap<String, BTreeMap<String, StoredObject>>>,
    failing_keys: Mutex<HashSet<(String, String)>>,
    failing_listings: Mutex<HashSet<String>>,
    stats: Mutex<MemoryStoreStats>,
}

impl MemoryStore {
    /// Create an empty store that tags objects with quoted MD5 digests.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that tags objects with `algorithm`.
    pub fn with_algorithm(algorithm: DigestAlgorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    /// Ensure `bucket` exists, even if empty.
    pub fn create_bucket(&self, bucket: &str) {
        lock(&self.buckets).entry(bucket.to_string()).or_default();
    }

    /// Store `data` under `key`, tagging it with its content digest.
    pub fn put(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        let data = data.into();
        let tag = quoted_tag(&compute_content_digest(&data, self.algorithm));
        self.put_with_tag(bucket, key, data, tag);
    }

    /// Store `data` under `key` with an explicit tag (e.g. a multipart ETag).
    pub fn put_with_tag(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>, tag: impl Into<String>) {
        lock(&self.buckets)
            .entry(bucket.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    data: data.into(),
                    tag: tag.into(),
                },
            );
    }

    /// Remove `key` from `bucket`.
    pub fn remove(&self, bucket: &str, key: &str) {
        if let Some(objects) = lock(&self.buckets).get_mut(bucket) {
            objects.remove(key);
        }
    }

    /// Make every download of `key` fail with a transport error.
    pub fn fail_downloads_of(&self, bucket: &str, key: &str) {
        lock(&self.failing_keys).insert((bucket.to_string(), key.to_string()));
    }

    /// Make listing `bucket` fail.
    pub fn fail_listing_of(&self, bucket: &str) {
        lock(&self.failing_listings).insert(bucket.to_string());
    }

    /// Snapshot of the call counters.
    pub fn stats(&self) -> MemoryStoreStats {
        lock(&self.stats).clone()
    }

    /// Reset the call counters.
    pub fn reset_stats(&self) {
        *lock(&self.stats) = MemoryStoreStats::default();
    }

    fn lookup(&self, bucket: &str, key: &str) -> Result<Option<StoredObject>> {
        let buckets = lock(&self.buckets);
        let objects = buckets.get(bucket).ok_or_else(|| Error::BucketNotFound {
            bucket: bucket.to_string(),
        })?;
        Ok(objects.get(key).cloned())
    }
}

impl ObjectStore for MemoryStore {
    fn list_objects(&self, bucket: &str) -> Result<Vec<RemoteObject>> {
        lock(&self.stats).list_calls += 1;

        if lock(&self.failing_listings).contains(bucket) {
            return Err(Error::Listing {
                bucket: bucket.to_string(),
                message: "injected listing failure".into(),
            });
        }

        let buckets = lock(&self.buckets);
        let objects = buckets.get(bucket).ok_or_else(|| Error::BucketNotFound {
            bucket: bucket.to_string(),
        })?;

        Ok(objects
            .iter()
            .map(|(key, object)| {
                RemoteObject::new(key.clone(), object.tag.clone(), object.data.len() as u64)
            })
            .collect())
    }

    fn download_object(&self, bucket: &str, key: &str) -> Result<Box<dyn Read + Send>> {
        {
            let mut stats = lock(&self.stats);
            stats.downloads += 1;
            stats.downloaded_keys.push(key.to_string());
        }

        if lock(&self.failing_keys).contains(&(bucket.to_string(), key.to_string())) {
            return Err(Error::Transport {
                key: key.to_string(),
                message: "injected download failure".into(),
            });
        }

        let object = self.lookup(bucket, key)?.ok_or_else(|| Error::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;
        Ok(Box::new(Cursor::new(object.data)))
    }

    fn fetch_optional_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        lock(&self.stats).optional_fetches += 1;
        Ok(self.lookup(bucket, key)?.map(|object| object.data))
    }
}
