//! Write path: persist content, then upsert its index entry.

use super::atomic::atomic_write;
use super::entry::{CacheEntry, check_ttl_days};
use super::handle::DocCache;
use super::hash::content_hash;
use super::reference::{absolute_path, relative_path};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What to store and for how long.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoreRequest {
    pub reference: String,
    /// Origin identifier, e.g. `github` or a host name.
    pub source: String,
    pub ttl_days: u32,
}

impl StoreRequest {
    pub fn new(reference: impl Into<String>, source: impl Into<String>, ttl_days: u32) -> Self {
        Self { reference: reference.into(), source: source.into(), ttl_days }
    }
}

impl DocCache {
    /// Store `content` under `request.reference`, replacing any previous entry.
    ///
    /// The index is only touched after the content write succeeded, so a
    /// failed store never leaves an entry pointing at a missing file.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` for an empty/invalid reference, an empty source or
    ///   a TTL above [`MAX_TTL_DAYS`](super::entry::MAX_TTL_DAYS)
    /// - `Error::Storage` if the content cannot be written
    /// - `Error::CorruptIndex` if the existing index cannot be parsed
    pub fn store(&self, request: &StoreRequest, content: &[u8]) -> Result<CacheEntry, Error> {
        let relative = relative_path(&request.reference)?;
        if request.source.trim().is_empty() {
            return Err(Error::Validation("source must not be empty".into()));
        }
        let ttl_days = check_ttl_days(request.ttl_days)?;

        let _lock = self.lock()?;

        let cached_at = self.now();
        let expires_at = CacheEntry::expiry_for(cached_at, ttl_days)
            .ok_or_else(|| Error::Validation(format!("ttl_days {ttl_days} from {cached_at} is out of range")))?;

        let destination = absolute_path(self.root(), &relative);
        atomic_write(&destination, content).map_err(|e| Error::storage(&format!("write {relative}"), e))?;

        let entry = CacheEntry {
            reference: request.reference.trim().to_string(),
            path: relative,
            source: request.source.clone(),
            cached_at,
            expires_at,
            ttl_days,
            size_bytes: content.len() as u64,
            hash: content_hash(content),
            last_accessed: cached_at,
        };

        let replaced = self.update_index_locked(|index| Ok(index.upsert(entry.clone())))?;

        tracing::debug!(
            reference = %entry.reference,
            size_bytes = entry.size_bytes,
            ttl_days = entry.ttl_days,
            replaced = replaced.is_some(),
            "stored document"
        );

        Ok(entry)
    }

    /// Store the contents of an already materialized file.
    pub fn store_file(&self, request: &StoreRequest, source_path: &Path) -> Result<CacheEntry, Error> {
        if source_path.as_os_str().is_empty() {
            return Err(Error::Validation("source path must not be empty".into()));
        }
        let content = std::fs::read(source_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(source_path.display().to_string()),
            _ => Error::storage(&format!("read {}", source_path.display()), e),
        })?;
        self.store(request, &content)
    }

    /// Read the stored bytes for `entry`.
    pub fn read_content(&self, entry: &CacheEntry) -> Result<Vec<u8>, Error> {
        let path = absolute_path(self.root(), &entry.path);
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(entry.reference.clone()),
            _ => Error::storage(&format!("read {}", entry.path), e),
        })
    }
}
