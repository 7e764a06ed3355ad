//! Walk the files under a cache root.

use super::index::{INDEX_FILE, LOCK_FILE};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A regular file found under the cache root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// `/`-separated path relative to the root, comparable to `CacheEntry::path`.
    pub relative: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// List every regular file under `root`, except the index and its lock.
///
/// Leftover temp files from an interrupted index write are included: any
/// writer holding the lock has already renamed its own.
///
/// Unreadable subtrees are skipped with a debug log; the caller checks the
/// root itself beforehand. Symlinks are not followed.
pub fn scan_files(root: &Path) -> Vec<ScannedFile> {
    let mut files = Vec::new();

    for item in WalkDir::new(root).follow_links(false).min_depth(1) {
        let item = match item {
            Ok(item) => item,
            Err(err) => {
                tracing::debug!(root = %root.display(), error = %err, "skipping unreadable cache path");
                continue;
            }
        };
        if !item.file_type().is_file() {
            continue;
        }

        let Ok(relative) = item.path().strip_prefix(root) else {
            continue;
        };
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if segments.len() == 1 && (segments[0] == INDEX_FILE || segments[0] == LOCK_FILE) {
            continue;
        }

        let size_bytes = item.metadata().map(|m| m.len()).unwrap_or(0);
        files.push(ScannedFile { relative: segments.join("/"), path: item.path().to_path_buf(), size_bytes });
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    files
}
