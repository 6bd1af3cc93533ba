//! Resolution of a read path into data-file fragments.
//!
//! A read path may be:
//!
//! - a single file, which is one fragment;
//! - a directory, whose regular files (recursively) are the fragments. Entries
//!   whose name starts with `.` or `_` are bookkeeping (`_SUCCESS`,
//!   `.part-00000.crc`, `_metadata`) and are skipped;
//! - a glob pattern such as `logs/*.csv` or `data/year=*/**/*.parquet`.
//!
//! Fragments are returned sorted so partition order is deterministic.
//!
//! ```no_run
//! use xshards::io::glob::resolve_fragments;
//!
//! let parts = resolve_fragments("data/sales")?;
//! let logs = resolve_fragments("logs/2024-*.json")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::error::XShardsError;
use anyhow::{Context, Result};
use glob::glob;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const GLOB_META: &[char] = &['*', '?', '['];

/// Expand a glob pattern into the sorted list of matching regular files.
///
/// Zero matches is not an error here; see [`resolve_fragments`].
///
/// # Errors
/// Returns an error if the pattern is invalid or a matched entry cannot be read.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;

    let mut result = Vec::new();
    for entry in paths {
        let path =
            entry.with_context(|| format!("error reading glob entry for pattern: {pattern}"))?;
        if path.is_file() && !is_hidden(&path) {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}

/// Names the engine treats as metadata rather than data.
pub(crate) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') || n.starts_with('_'))
}

fn walk_dir(root: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        // depth 0 is the root itself, which may legitimately be named `_tmp`
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));
    for entry in walker {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        if entry.file_type().is_file() {
            out.push(entry.into_path());
        }
    }
    out.sort();
    Ok(out)
}

/// Resolve `path` into the data files that make up a dataset.
///
/// # Errors
/// - [`XShardsError::PathNotFound`] when nothing exists at `path` (or the
///   pattern matches nothing);
/// - [`XShardsError::NoDataFiles`] when `path` is a directory without data files.
pub fn resolve_fragments(path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    let fragments = if path.is_file() {
        vec![path.to_path_buf()]
    } else if path.is_dir() {
        let files = walk_dir(path)?;
        if files.is_empty() {
            return Err(XShardsError::NoDataFiles(path.to_path_buf()).into());
        }
        files
    } else {
        let pattern = path.to_string_lossy();
        if pattern.contains(GLOB_META) {
            expand_glob(&pattern)?
        } else {
            Vec::new()
        }
    };
    if fragments.is_empty() {
        return Err(XShardsError::PathNotFound(path.to_path_buf()).into());
    }
    tracing::debug!(path = %path.display(), fragments = fragments.len(), "resolved fragments");
    Ok(fragments)
}
