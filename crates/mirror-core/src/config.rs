//! Mirror configuration
//!
//! Settings come from a dotenv-style document stored in the bucket itself
//! (`.env.s3git`), overridden by process environment variables with the same
//! names, or from a TOML/JSON file loaded through [`mirror_fs::ConfigStore`].

use std::collections::BTreeMap;

use mirror_fs::{ConfigStore, DigestAlgorithm, NormalizedPath};
use mirror_git::Author;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Bucket key of the settings document. Never mirrored into the tree.
pub const SETTINGS_DOCUMENT_KEY: &str = ".env.s3git";

/// Default bucket key of the custom ignore document.
pub const DEFAULT_IGNORE_DOCUMENT_KEY: &str = ".s3gitignore";

/// Objects larger than this many bytes are left alone by default.
pub const DEFAULT_SIZE_CEILING: u64 = 10_000_000;

pub const DEFAULT_COMMIT_MESSAGE: &str = "S3 updated";

pub const DEFAULT_REMOTE: &str = "origin";

/// Hidden prefixes that are still deleted when absent remotely.
pub const DEFAULT_HIDDEN_ALLOWLIST: &[&str] = &[".obsidian/"];

/// Setting names recognised in the settings document and the environment.
pub mod keys {
    pub const ORIGIN: &str = "GIT_ORIGIN";
    pub const AUTHOR_NAME: &str = "USERNAME";
    pub const AUTHOR_EMAIL: &str = "EMAIL";
    pub const SIZE_CEILING: &str = "SIZE_CEILING";
    pub const IGNORE_FILE: &str = "IGNORE_FILE";
    pub const CONCURRENCY: &str = "CONCURRENCY";
    pub const COMMIT_MESSAGE: &str = "COMMIT_MESSAGE";
    pub const REMOTE: &str = "GIT_REMOTE";
    pub const DIGEST: &str = "DIGEST";
    pub const HIDDEN_ALLOWLIST: &str = "HIDDEN_ALLOWLIST";

    pub const ALL: &[&str] = &[
        ORIGIN,
        AUTHOR_NAME,
        AUTHOR_EMAIL,
        SIZE_CEILING,
        IGNORE_FILE,
        CONCURRENCY,
        COMMIT_MESSAGE,
        REMOTE,
        DIGEST,
        HIDDEN_ALLOWLIST,
    ];
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Clone URL of the mirror repository
    pub origin_url: String,
    /// Author and committer name
    pub author_name: String,
    /// Author and committer email
    pub author_email: String,
    /// Largest object size, in bytes, that is synced
    #[serde(default = "default_size_ceiling")]
    pub size_ceiling: u64,
    /// Bucket key of the custom ignore document
    #[serde(default = "default_ignore_document_key")]
    pub ignore_document_key: String,
    /// Fetch worker count; defaults to available parallelism
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
    /// Hidden path prefixes that may still be deleted
    #[serde(default = "default_hidden_allowlist")]
    pub hidden_allowlist: Vec<String>,
    /// Remote to push to
    #[serde(default = "default_remote")]
    pub remote: String,
    /// Digest family of the store's content tags
    #[serde(default)]
    pub digest: DigestAlgorithm,
    /// Clone depth for network remotes
    #[serde(default = "default_clone_depth")]
    pub clone_depth: Option<u32>,
}

fn default_size_ceiling() -> u64 {
    DEFAULT_SIZE_CEILING
}

fn default_ignore_document_key() -> String {
    DEFAULT_IGNORE_DOCUMENT_KEY.to_string()
}

fn default_commit_message() -> String {
    DEFAULT_COMMIT_MESSAGE.to_string()
}

fn default_hidden_allowlist() -> Vec<String> {
    DEFAULT_HIDDEN_ALLOWLIST.iter().map(|s| s.to_string()).collect()
}

fn default_remote() -> String {
    DEFAULT_REMOTE.to_string()
}

fn default_clone_depth() -> Option<u32> {
    Some(1)
}

impl MirrorConfig {
    /// Configuration with every optional field at its default.
    pub fn new(
        origin_url: impl Into<String>,
        author_name: impl Into<String>,
        author_email: impl Into<String>,
    ) -> Self {
        Self {
            origin_url: origin_url.into(),
            author_name: author_name.into(),
            author_email: author_email.into(),
            size_ceiling: DEFAULT_SIZE_CEILING,
            ignore_document_key: default_ignore_document_key(),
            concurrency: None,
            commit_message: default_commit_message(),
            hidden_allowlist: default_hidden_allowlist(),
            remote: default_remote(),
            digest: DigestAlgorithm::default(),
            clone_depth: default_clone_depth(),
        }
    }

    /// Load configuration from a TOML or JSON file.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        let config: Self = ConfigStore::new().load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration from key/value settings.
    ///
    /// Origin and author fields are required. Optional numeric fields fall
    /// back to their defaults when absent or unparseable.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let required = |key: &str| {
            settings
                .get(key)
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
                .ok_or_else(|| Error::config(format!("{key} is not set")))
        };

        let config = Self::new(
            required(keys::ORIGIN)?,
            required(keys::AUTHOR_NAME)?,
            required(keys::AUTHOR_EMAIL)?,
        );
        Ok(config.with_overrides(settings))
    }

    /// Apply the optional settings on top of this configuration.
    ///
    /// Origin and author keys are not read here.
    pub fn with_overrides(mut self, settings: &Settings) -> Self {
        if let Some(raw) = settings.get(keys::SIZE_CEILING) {
            match raw.trim().parse::<u64>() {
                Ok(ceiling) => self.size_ceiling = ceiling,
                Err(_) => tracing::warn!(
                    value = %raw,
                    default = DEFAULT_SIZE_CEILING,
                    "Unparseable size ceiling, using default"
                ),
            }
        }

        if let Some(key) = settings.get(keys::IGNORE_FILE).filter(|v| !v.is_empty()) {
            self.ignore_document_key = key.to_string();
        }

        if let Some(raw) = settings.get(keys::CONCURRENCY) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.concurrency = Some(n),
                _ => tracing::warn!(value = %raw, "Invalid concurrency, using available parallelism"),
            }
        }

        if let Some(message) = settings.get(keys::COMMIT_MESSAGE).filter(|v| !v.is_empty()) {
            self.commit_message = message.to_string();
        }

        if let Some(remote) = settings.get(keys::REMOTE).filter(|v| !v.is_empty()) {
            self.remote = remote.to_string();
        }

        if let Some(raw) = settings.get(keys::DIGEST) {
            match raw.parse::<DigestAlgorithm>() {
                Ok(digest) => self.digest = digest,
                Err(e) => tracing::warn!(error = %e, "Unknown digest, using md5"),
            }
        }

        if let Some(raw) = settings.get(keys::HIDDEN_ALLOWLIST) {
            self.hidden_allowlist = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        self
    }

    /// Check that required fields are present.
    pub fn validate(&self) -> Result<()> {
        if self.origin_url.trim().is_empty() {
            return Err(Error::config("origin_url is empty"));
        }
        if self.author_name.trim().is_empty() || self.author_email.trim().is_empty() {
            return Err(Error::config("author name and email are required"));
        }
        if self.concurrency == Some(0) {
            return Err(Error::config("concurrency must be at least 1"));
        }
        Ok(())
    }

    /// Number of fetch workers to run.
    pub fn worker_count(&self) -> usize {
        self.concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    pub fn author(&self) -> Author {
        Author::new(&self.author_name, &self.author_email)
    }
}

/// Flat key/value settings, as read from a dotenv document or the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a dotenv-style document.
    ///
    /// Supports blank lines, `#` comments, an optional `export ` prefix,
    /// single- or double-quoted values and trailing ` #` comments on
    /// unquoted values. Lines without `=` are skipped.
    pub fn parse_dotenv(text: &str) -> Self {
        let mut values = BTreeMap::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, raw)) = line.split_once('=') else {
                tracing::debug!(line = %line, "Skipping settings line without '='");
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            values.insert(key.to_string(), unquote(raw.trim()));
        }

        Self { values }
    }

    /// Collect recognised settings from environment-style pairs.
    pub fn from_env<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| keys::ALL.contains(&k.as_str()))
            .collect();
        Self { values }
    }

    /// Return `self` with every value from `overrides` applied on top.
    pub fn overridden_by(mut self, overrides: &Settings) -> Self {
        for (key, value) in &overrides.values {
            self.values.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn unquote(raw: &str) -> String {
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return raw[1..raw.len() - 1].to_string();
        }
    }
    match raw.find(" #") {
        Some(idx) => raw[..idx].trim_end().to_string(),
        None => raw.to_string(),
    }
}
