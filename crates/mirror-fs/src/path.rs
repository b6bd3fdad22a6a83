//! Normalized path handling and object-key validation

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Name of the VCS metadata directory at the working-tree root.
pub const GIT_DIR: &str = ".git";

/// A path normalized to use forward slashes internally.
///
/// Object keys and working-tree relative paths share this grammar, so a key
/// maps onto a local path by joining it to the tree root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    ///
    /// Converts backslashes to forward slashes for internal storage.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        let normalized = path_str.replace('\\', "/");
        Self { inner: normalized }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Join this path with a segment.
    pub fn join(&self, segment: &str) -> Self {
        let segment_normalized = segment.replace('\\', "/");
        let joined = if self.inner.ends_with('/') {
            format!("{}{}", self.inner, segment_normalized)
        } else {
            format!("{}/{}", self.inner, segment_normalized)
        };
        Self { inner: joined }
    }

    /// Get the parent directory.
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.inner.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(idx) if idx > 0 => Some(Self {
                inner: trimmed[..idx].to_string(),
            }),
            Some(0) => Some(Self {
                inner: "/".to_string(),
            }),
            _ => None,
        }
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.inner.trim_end_matches('/');
        trimmed.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Get the extension if present.
    pub fn extension(&self) -> Option<&str> {
        self.file_name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 {
                None
            } else {
                Some(&name[idx + 1..])
            }
        })
    }

    /// Express `path` relative to this root, in forward-slash form.
    ///
    /// Returns `None` when `path` is not below the root.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(self.to_native()).ok()?;
        let rel = rel.to_string_lossy().replace('\\', "/");
        if rel.is_empty() { None } else { Some(rel) }
    }

    /// Resolve the root to its canonical on-disk form.
    pub fn canonicalize(&self) -> Result<Self> {
        let native = self.to_native();
        dunce::canonicalize(&native)
            .map(Self::new)
            .map_err(|e| Error::io(native, e))
    }

    /// Check if this path exists on the filesystem.
    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

/// Validate that an object key can be materialized below a working-tree root.
///
/// A valid key is relative, uses `/` separators, has no empty, `.` or `..`
/// segments, and does not reach into the VCS metadata directory.
pub fn validate_object_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::invalid_key(key, "key is empty"));
    }
    if key.contains('\0') {
        return Err(Error::invalid_key(key, "key contains a NUL byte"));
    }
    if key.contains('\\') {
        return Err(Error::invalid_key(key, "key contains a backslash"));
    }
    if key.starts_with('/') {
        return Err(Error::invalid_key(key, "key is absolute"));
    }
    if key.ends_with('/') {
        return Err(Error::invalid_key(key, "key names a directory"));
    }

    for segment in key.split('/') {
        match segment {
            "" => return Err(Error::invalid_key(key, "key has an empty segment")),
            "." | ".." => {
                return Err(Error::invalid_key(key, "key has a relative segment"));
            }
            _ => {}
        }
    }

    if key == GIT_DIR || key.starts_with(".git/") {
        return Err(Error::invalid_key(key, "key targets the git directory"));
    }

    Ok(())
}

/// Whether a relative path is hidden at the top level (`.env`, `.obsidian/x`).
///
/// Only the leading segment is considered; `notes/.draft` is not hidden.
pub fn is_hidden(relative: &str) -> bool {
    relative.starts_with('.')
}
