//! Core types and shared functionality for codex-cache.
//!
//! This crate provides:
//! - The document cache: index, store, lookup, clear, health, metrics
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{DocCache, DocumentSource, FetchedDocument};
pub use config::AppConfig;
pub use error::Error;
