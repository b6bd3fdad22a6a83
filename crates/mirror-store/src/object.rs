//! Remote object metadata

use serde::{Deserialize, Serialize};

/// One object in a bucket at listing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Path-like key, unique within a listing
    pub key: String,
    /// Opaque content tag as reported by the store (S3: quoted MD5 ETag)
    pub content_tag: String,
    /// Size in bytes
    pub size: u64,
}

impl RemoteObject {
    pub fn new(key: impl Into<String>, content_tag: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            content_tag: content_tag.into(),
            size,
        }
    }

    /// Whether the key is a zero-byte "folder" placeholder (`photos/`).
    pub fn is_directory_marker(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// Format a hex digest the way S3 reports ETags: wrapped in literal quotes.
pub fn quoted_tag(hex_digest: &str) -> String {
    format!("\"{hex_digest}\"")
}
