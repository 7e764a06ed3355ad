//! Cache-related MCP tools.
//!
//! Thin adapters from tool parameters onto `DocCache` operations.

pub mod clear;
pub mod health;
pub mod lookup;
pub mod metrics;
pub mod rebuild;
pub mod store;

pub use clear::{CacheClearParams, clear_impl};
pub use health::{CacheHealthParams, health_impl};
pub use lookup::{CacheLookupParams, lookup_impl};
pub use metrics::{CacheMetricsParams, metrics_impl};
pub use rebuild::{CacheRebuildParams, rebuild_impl};
pub use store::{CacheStoreParams, store_impl};
