//! Index file persistence.
//!
//! The index is one JSON document per cache root. Loading a missing file
//! yields an empty index; saving always goes through a temp file and a
//! rename so a reader never observes a partial write.

use super::atomic::atomic_write;
use super::entry::CacheIndex;
use crate::Error;
use std::io::ErrorKind;
use std::path::Path;

/// File name of the index inside the cache root.
pub const INDEX_FILE: &str = "index.json";

/// File name of the advisory lock inside the cache root.
pub const LOCK_FILE: &str = "index.json.lock";

/// Read and parse the index at `path`.
///
/// # Errors
///
/// - `Error::CorruptIndex` if the file exists but is not a valid index
/// - `Error::Storage` if the file exists but cannot be read
pub fn load(path: &Path) -> Result<CacheIndex, Error> {
    match read(path)? {
        Some(index) => Ok(index),
        None => Ok(CacheIndex::default()),
    }
}

/// Like [`load`], but distinguishes a missing index from an empty one.
pub fn read(path: &Path) -> Result<Option<CacheIndex>, Error> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(Error::storage("read index", err)),
    };

    let mut index: CacheIndex = serde_json::from_slice(&bytes)
        .map_err(|e| Error::CorruptIndex { path: path.to_path_buf(), reason: e.to_string() })?;

    let drifted = index
        .normalize()
        .map_err(|reason| Error::CorruptIndex { path: path.to_path_buf(), reason })?;
    if drifted > 0 {
        tracing::warn!(path = %path.display(), drifted, "index had inconsistent derived fields; corrected in memory");
    }

    Ok(Some(index))
}

/// Serialize `index` and atomically replace the file at `path`.
///
/// Derived fields are recomputed first so the persisted invariants hold.
pub fn save(path: &Path, index: &CacheIndex) -> Result<(), Error> {
    let mut index = index.clone();
    index.normalize().map_err(Error::Validation)?;

    let json = serde_json::to_vec_pretty(&index).map_err(|e| Error::storage("serialize index", e))?;
    atomic_write(path, &json).map_err(|e| Error::storage("write index", e))?;

    tracing::debug!(path = %path.display(), entries = index.stats.total_entries, "index saved");
    Ok(())
}
