//! Filesystem-backed object store
//!
//! Treats each subdirectory of a root as a bucket and every regular file
//! below it as an object. Content tags are computed the way S3 reports
//! ETags for single-part uploads: the quoted hex digest of the bytes.

use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use mirror_fs::checksum::compute_file_digest;
use mirror_fs::{DigestAlgorithm, NormalizedPath};
use walkdir::WalkDir;

use crate::object::quoted_tag;
use crate::{Error, ObjectStore, RemoteObject, Result};

/// Object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    algorithm: DigestAlgorithm,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            algorithm: DigestAlgorithm::default(),
        }
    }

    pub fn with_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        if bucket.is_empty() || bucket.contains('/') || bucket.contains('\\') || bucket.starts_with('.') {
            return Err(Error::BucketNotFound {
                bucket: bucket.to_string(),
            });
        }
        let dir = self.root.join(bucket);
        if !dir.is_dir() {
            return Err(Error::BucketNotFound {
                bucket: bucket.to_string(),
            });
        }
        Ok(dir)
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        mirror_fs::validate_object_key(key).map_err(|_| Error::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;
        Ok(self.bucket_dir(bucket)?.join(key))
    }
}

impl ObjectStore for DirectoryStore {
    fn list_objects(&self, bucket: &str) -> Result<Vec<RemoteObject>> {
        let dir = self.bucket_dir(bucket)?;
        let root = NormalizedPath::new(&dir);
        let mut objects = Vec::new();

        for entry in WalkDir::new(&dir).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Listing {
                bucket: bucket.to_string(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(key) = root.relative(entry.path()) else {
                continue;
            };

            let size = entry
                .metadata()
                .map_err(|e| Error::Listing {
                    bucket: bucket.to_string(),
                    message: e.to_string(),
                })?
                .len();
            let digest = compute_file_digest(entry.path(), self.algorithm)
                .map_err(|e| Error::io(entry.path(), e))?;

            objects.push(RemoteObject::new(key, quoted_tag(&digest), size));
        }

        tracing::debug!(bucket = %bucket, count = objects.len(), "Listed directory bucket");
        Ok(objects)
    }

    fn download_object(&self, bucket: &str, key: &str) -> Result<Box<dyn Read + Send>> {
        let path = self.object_path(bucket, key)?;
        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    fn fetch_optional_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(bucket, key)?;
        read_optional(&path)
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}
