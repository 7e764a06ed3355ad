//! Read path: is a reference cached, and is it still fresh?
//!
//! Lookups never take the index lock and never write; absence and expiry
//! are ordinary results.

use super::entry::CacheEntry;
use super::handle::DocCache;
use super::index;
use super::reference::{absolute_path, relative_path};
use crate::Error;
use serde::{Deserialize, Serialize};

/// Why a lookup came out the way it did, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LookupReason {
    /// No file on disk for the reference.
    NotInCache,
    /// File present but there is no usable index at all.
    IndexMissing,
    /// File present but the index has no entry for it.
    NotInIndex,
    /// Entry present and `now >= expires_at`.
    Expired,
    /// Entry present and `now < expires_at`.
    Valid,
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LookupResult {
    pub reference: String,
    pub cached: bool,
    pub fresh: bool,
    pub reason: LookupReason,
    /// Present for `expired` and `valid`.
    pub entry: Option<CacheEntry>,
}

impl LookupResult {
    fn without_entry(reference: &str, cached: bool, reason: LookupReason) -> Self {
        Self { reference: reference.to_string(), cached, fresh: false, reason, entry: None }
    }
}

impl DocCache {
    /// Look up `reference` without mutating anything.
    ///
    /// # Errors
    ///
    /// Only `Error::Validation` for a malformed reference, or `Error::Storage`
    /// if the index exists but cannot be read at all.
    pub fn lookup(&self, reference: &str) -> Result<LookupResult, Error> {
        let relative = relative_path(reference)?;
        let reference = reference.trim();

        if !absolute_path(self.root(), &relative).is_file() {
            return Ok(LookupResult::without_entry(reference, false, LookupReason::NotInCache));
        }

        let index = match index::read(&self.index_path()) {
            Ok(Some(index)) => index,
            Ok(None) => return Ok(LookupResult::without_entry(reference, true, LookupReason::IndexMissing)),
            Err(Error::CorruptIndex { path, reason }) => {
                tracing::warn!(path = %path.display(), %reason, "corrupt index; treating lookup as index_missing");
                return Ok(LookupResult::without_entry(reference, true, LookupReason::IndexMissing));
            }
            Err(err) => return Err(err),
        };

        let Some(entry) = index.get(reference) else {
            return Ok(LookupResult::without_entry(reference, true, LookupReason::NotInIndex));
        };

        let fresh = entry.is_fresh(self.now());
        Ok(LookupResult {
            reference: reference.to_string(),
            cached: true,
            fresh,
            reason: if fresh { LookupReason::Valid } else { LookupReason::Expired },
            entry: Some(entry.clone()),
        })
    }
}
