//! Atomic I/O operations
//!
//! Content always lands in a temporary sibling first and is renamed into
//! place, so a reader never observes a truncated file.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use tempfile::{Builder, NamedTempFile};

use crate::{Error, NormalizedPath, Result};

/// Suffix of in-flight temporary files.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Whether `relative` names a temporary file left behind by an interrupted
/// atomic write (`.<name>.<random>.partial`).
pub fn is_partial_file(relative: &str) -> bool {
    let name = relative.rsplit('/').next().unwrap_or(relative);
    name.len() > 1 + PARTIAL_SUFFIX.len() && name.starts_with('.') && name.ends_with(PARTIAL_SUFFIX)
}

/// Create the parent directory of `path` if it is missing.
///
/// Safe to race against other threads creating the same directory.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    Ok(())
}

/// Write content atomically to a file.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let mut reader = content;
    write_atomic_from_reader(path, &mut reader).map(|_| ())
}

/// Stream `reader` into `path` atomically, returning the number of bytes written.
///
/// The temporary file is created in the destination directory (same
/// filesystem, so the rename is atomic) and is removed if any step fails.
pub fn write_atomic_from_reader(path: &NormalizedPath, reader: &mut dyn Read) -> Result<u64> {
    let native_path = path.to_native();
    ensure_parent_dir(&native_path)?;

    let mut temp_file = temp_sibling(&native_path)?;
    let temp_path = temp_file.path().to_path_buf();

    let written = std::io::copy(reader, &mut temp_file).map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .flush()
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .persist(&native_path)
        .map_err(|e| Error::io(&native_path, e.error))?;

    Ok(written)
}

fn temp_sibling(native_path: &Path) -> Result<NamedTempFile> {
    let dir = match native_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let prefix = format!(
        ".{}.",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default()
    );

    Builder::new()
        .prefix(&prefix)
        .suffix(PARTIAL_SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir, e))
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Write text content to a file atomically.
pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

/// Remove a single file.
pub fn remove_file(path: &NormalizedPath) -> Result<()> {
    let native_path = path.to_native();
    fs::remove_file(&native_path).map_err(|e| Error::io(&native_path, e))
}
