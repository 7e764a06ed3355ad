//! Content digests for integrity and dedup checks.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of a stored document.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
