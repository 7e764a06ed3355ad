//! Free-space probing for the cache volume.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// Space on the volume holding the cache root.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DiskUsage {
    pub available_bytes: u64,
    pub total_bytes: u64,
}

impl DiskUsage {
    pub fn free_percent(&self) -> Option<f64> {
        (self.total_bytes > 0).then(|| self.available_bytes as f64 / self.total_bytes as f64 * 100.0)
    }

    pub fn available_mb(&self) -> u64 {
        self.available_bytes / (1024 * 1024)
    }
}

/// Why a probe produced no numbers.
#[derive(Debug, thiserror::Error)]
pub enum DiskProbeError {
    #[error("disk probe timed out after {0:?}")]
    TimedOut(Duration),

    #[error("disk probe failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Query free and total space for `path`, giving up after `timeout`.
///
/// A cache root that does not exist yet is measured at its nearest existing
/// ancestor. The statvfs call runs on a helper thread so a hung mount cannot
/// stall the caller.
pub fn probe(path: &Path, timeout: Duration) -> Result<DiskUsage, DiskProbeError> {
    let target = nearest_existing(path);
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        let usage = fs2::available_space(&target).and_then(|available_bytes| {
            fs2::total_space(&target).map(|total_bytes| DiskUsage { available_bytes, total_bytes })
        });
        // The receiver may have given up already.
        let _ = tx.send(usage);
    });

    match rx.recv_timeout(timeout) {
        Ok(usage) => Ok(usage?),
        Err(_) => Err(DiskProbeError::TimedOut(timeout)),
    }
}

fn nearest_existing(path: &Path) -> PathBuf {
    path.ancestors()
        .find(|p| !p.as_os_str().is_empty() && p.exists())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
