//! Cache handle: the cache root plus the clock every operation reads.
//!
//! Store, lookup, clear, health, and metrics are implemented as `impl DocCache`
//! blocks in their own modules; this module owns the shared plumbing,
//! in particular the single locked read-modify-write routine all writers use.

use super::clock::{Clock, SystemClock};
use super::entry::CacheIndex;
use super::index::{self, INDEX_FILE, LOCK_FILE};
use super::lock::IndexLock;
use crate::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle to a cache directory.
///
/// Cheap to clone; clones share the clock.
#[derive(Clone)]
pub struct DocCache {
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for DocCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocCache").field("root", &self.root).finish_non_exhaustive()
    }
}

impl DocCache {
    /// Open a cache rooted at `root`.
    ///
    /// The directory is created lazily by the first write, so opening a
    /// cache that was never initialized is not an error.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), clock: Arc::new(SystemClock) }
    }

    /// Replace the time source (tests use [`super::clock::ManualClock`]).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Current index contents; a missing index reads as empty.
    pub fn load_index(&self) -> Result<CacheIndex, Error> {
        index::load(&self.index_path())
    }

    pub(crate) fn lock(&self) -> Result<IndexLock, Error> {
        IndexLock::acquire(&self.lock_path())
    }

    /// Run one load → mutate → save cycle under the index lock.
    ///
    /// A corrupt index is propagated rather than overwritten. If `mutate`
    /// fails the index is not saved.
    pub(crate) fn update_index<T>(&self, mutate: impl FnOnce(&mut CacheIndex) -> Result<T, Error>) -> Result<T, Error> {
        let _lock = self.lock()?;
        self.update_index_locked(mutate)
    }

    /// Same as [`Self::update_index`] for callers already holding the lock.
    pub(crate) fn update_index_locked<T>(
        &self, mutate: impl FnOnce(&mut CacheIndex) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let path = self.index_path();
        let mut index = index::load(&path)?;
        let value = mutate(&mut index)?;
        index::save(&path, &index)?;
        Ok(value)
    }

    /// Count a fetch served from cache.
    pub fn record_hit(&self, elapsed_ms: f64) -> Result<(), Error> {
        self.update_index(|index| {
            index.stats.record_hit(elapsed_ms);
            Ok(())
        })
    }

    /// Count a fetch that had to go to the origin.
    pub fn record_miss(&self, fetch_ms: f64) -> Result<(), Error> {
        self.update_index(|index| {
            index.stats.record_miss(fetch_ms);
            Ok(())
        })
    }

    /// Count a fetch that failed at the origin.
    pub fn record_failed_fetch(&self) -> Result<(), Error> {
        self.update_index(|index| {
            index.stats.record_failed_fetch();
            Ok(())
        })
    }
}
