//! Client code for codex-cache.
//!
//! This crate provides the HTTP document source the cache fetches through,
//! shared by the server and CLI.

pub mod fetch;

pub use fetch::{HttpSource, SourceConfig, canonicalize, resolve_reference};
