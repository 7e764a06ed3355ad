//! Disk-backed document cache with a single JSON index.
//!
//! Documents live as plain files under the cache root; `index.json` records
//! each reference, where it is stored, and when it expires, plus aggregate
//! usage statistics. It provides:
//!
//! - Atomic index writes (temp file + rename) under an advisory file lock
//! - TTL-based freshness checks that never write
//! - Scoped clearing with dry-run support
//! - Health checks with optional orphan repair, and metrics
//! - Fetch-through against a pluggable [`DocumentSource`]

pub mod atomic;
pub mod clock;
pub mod disk;
pub mod entry;
pub mod fetch;
pub mod handle;
pub mod hash;
pub mod health;
pub mod index;
pub mod lock;
pub mod lookup;
pub mod metrics;
pub mod rebuild;
pub mod reclaim;
pub mod reference;
pub mod scan;
pub mod store;

pub use crate::Error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, CacheIndex, CacheStats};
pub use fetch::{DocumentSource, FetchOutcome, FetchedDocument};
pub use handle::DocCache;
pub use health::{CheckCategory, CheckStatus, HealthOptions, HealthReport, HealthStatus};
pub use lookup::{LookupReason, LookupResult};
pub use metrics::CacheMetrics;
pub use rebuild::RebuildReport;
pub use reclaim::{ClearReport, ClearScope};
pub use store::StoreRequest;
