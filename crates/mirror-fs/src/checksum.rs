//! Content digests
//!
//! Object stores report a content tag per object; for S3 that is the
//! lowercase hex MD5 of the bytes. Local files are hashed with the same
//! algorithm so the two can be compared without a download.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Error;

/// Digest family used to compare local files against remote content tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// MD5, as reported by S3 ETags for single-part uploads
    #[default]
    Md5,
    /// SHA-256
    Sha256,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(Error::UnknownDigest {
                name: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute the lowercase hex digest of in-memory content.
pub fn compute_content_digest(content: &[u8], algorithm: DigestAlgorithm) -> String {
    match algorithm {
        DigestAlgorithm::Md5 => hex::encode(Md5::digest(content)),
        DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(content)),
    }
}

/// Compute the lowercase hex digest of a file, streaming its contents.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn compute_file_digest(path: &Path, algorithm: DigestAlgorithm) -> std::io::Result<String> {
    let reader = BufReader::new(File::open(path)?);
    match algorithm {
        DigestAlgorithm::Md5 => digest_reader::<Md5>(reader),
        DigestAlgorithm::Sha256 => digest_reader::<Sha256>(reader),
    }
}

fn digest_reader<D: Digest>(mut reader: impl Read) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
