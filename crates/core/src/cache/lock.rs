//! Advisory lock serializing every read-modify-write of the index.

use crate::Error;
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Exclusive lock on a cache root, safe across processes and threads.
///
/// Released on drop.
#[derive(Debug)]
pub struct IndexLock {
    file: File,
    path: PathBuf,
    // fs2 locks are per process on Unix, so threads of one process are kept
    // apart by this guard while the file lock handles other processes.
    _guard: MutexGuard<'static, ()>,
}

impl IndexLock {
    /// Block until the lock file at `path` is held exclusively.
    pub fn acquire(path: &Path) -> Result<Self, Error> {
        let guard = process_lock_for_path(path)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::storage("create cache root", e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| Error::storage("open index lock", e))?;
        file.lock_exclusive()
            .map_err(|e| Error::storage("acquire index lock", e))?;

        tracing::trace!(path = %path.display(), "index lock acquired");
        Ok(Self { file, path: path.to_path_buf(), _guard: guard })
    }
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::debug!(path = %self.path.display(), error = %err, "failed to release index lock");
        }
    }
}

fn process_lock_for_path(path: &Path) -> &'static Mutex<()> {
    static PROCESS_LOCKS: OnceLock<Mutex<HashMap<PathBuf, &'static Mutex<()>>>> = OnceLock::new();
    let locks = PROCESS_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));

    let mut map = locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(existing) = map.get(path) {
        return existing;
    }

    let mutex: &'static Mutex<()> = Box::leak(Box::new(Mutex::new(())));
    map.insert(path.to_path_buf(), mutex);
    mutex
}
