//! Reference validation and the reference → on-disk path mapping.
//!
//! The mapping is deterministic so lookups can check the file without
//! consulting the index:
//!
//! - `@codex/acme/readme.md` → `codex/acme/readme.md`
//! - `https://docs.example.com/guide/` → `https/docs.example.com/guide/index`

use super::index::{INDEX_FILE, LOCK_FILE};
use crate::Error;
use std::path::{Path, PathBuf};

/// Namespace prefix used by project-scoped references.
pub const PROJECT_NAMESPACE: &str = "@codex";

/// Reference prefix selected by the `project` clear scope.
pub fn project_prefix(project: &str) -> String {
    format!("{PROJECT_NAMESPACE}/{project}/")
}

/// Validate `reference` and derive its path relative to the cache root.
///
/// # Errors
///
/// Returns `Error::Validation` for empty references, `.`/`..` segments,
/// backslashes or NUL bytes, and references that would land on the index
/// or lock file.
pub fn relative_path(reference: &str) -> Result<String, Error> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("reference must not be empty".into()));
    }
    if trimmed.contains('\\') || trimmed.contains('\0') {
        return Err(Error::Validation(format!("reference contains an invalid character: {reference}")));
    }

    let rest = match trimmed.split_once("://") {
        Some((scheme, rest)) => format!("{scheme}/{rest}"),
        None => trimmed.trim_start_matches('@').to_string(),
    };

    let mut segments = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" => continue,
            "." | ".." => {
                return Err(Error::Validation(format!("reference must not traverse directories: {reference}")));
            }
            s => segments.push(s),
        }
    }

    let Some(&first) = segments.first() else {
        return Err(Error::Validation(format!("reference has no path segments: {reference}")));
    };
    if rest.ends_with('/') {
        segments.push("index");
    }
    if segments.len() == 1 && is_internal_file(first) {
        return Err(Error::Validation(format!("reference collides with a cache file: {reference}")));
    }

    Ok(segments.join("/"))
}

/// Whether a file name at the cache root belongs to the cache itself.
pub fn is_internal_file(name: &str) -> bool {
    name == INDEX_FILE || name == LOCK_FILE || name.starts_with(".index.json.")
}

/// Inverse of [`relative_path`] for files found on disk.
///
/// Returns `None` when no reference maps back onto `relative`.
pub fn reference_for_path(relative: &str) -> Option<String> {
    let candidate = match relative.split_once('/') {
        Some((scheme @ ("http" | "https"), rest)) => format!("{scheme}://{rest}"),
        _ => format!("@{relative}"),
    };
    match relative_path(&candidate) {
        Ok(mapped) if mapped == relative => Some(candidate),
        _ => None,
    }
}

/// Join a `/`-separated relative path onto the cache root.
pub fn absolute_path(root: &Path, relative: &str) -> PathBuf {
    relative.split('/').fold(root.to_path_buf(), |path, segment| path.join(segment))
}
