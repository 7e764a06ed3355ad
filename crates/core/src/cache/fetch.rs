//! Fetch-through: serve fresh documents from the cache, fetch the rest.
//!
//! This is the producer of the hit/miss/latency statistics kept in the index.

use super::entry::{CacheEntry, check_ttl_days};
use super::handle::DocCache;
use super::store::StoreRequest;
use crate::Error;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Instant;

/// A document as returned by an origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    pub bytes: Vec<u8>,
    /// Origin identifier recorded on the entry, e.g. a host name.
    pub source: String,
}

/// Transport that retrieves documents the cache does not hold.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, reference: &str) -> Result<FetchedDocument, Error>;
}

#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome {
    pub entry: CacheEntry,
    #[serde(skip)]
    pub content: Vec<u8>,
    pub from_cache: bool,
}

impl FetchOutcome {
    /// Content as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

impl DocCache {
    /// Return `reference` from the cache when fresh, otherwise fetch and store it.
    ///
    /// `force_refresh` skips the cache check. Filesystem work runs on the
    /// blocking pool.
    ///
    /// # Errors
    ///
    /// Validation errors for the reference or TTL, any error from `source` (after it
    /// was counted as a failed fetch), and storage errors from the write.
    pub async fn get_or_fetch(
        &self, source: &dyn DocumentSource, reference: &str, ttl_days: u32, force_refresh: bool,
    ) -> Result<FetchOutcome, Error> {
        check_ttl_days(ttl_days)?;
        if !force_refresh && let Some(outcome) = self.cached(reference).await? {
            return Ok(outcome);
        }

        let started = Instant::now();
        let fetched = match source.fetch(reference).await {
            Ok(fetched) => fetched,
            Err(err) => {
                tracing::debug!(reference, error = %err, "fetch failed");
                let cache = self.clone();
                if let Err(stats_err) = blocking(move || cache.record_failed_fetch()).await {
                    tracing::warn!(error = %stats_err, "could not record failed fetch");
                }
                return Err(err);
            }
        };
        let fetch_ms = elapsed_ms(started);

        let cache = self.clone();
        let request = StoreRequest::new(reference, fetched.source, ttl_days);
        let content = fetched.bytes;
        let (entry, content) = blocking(move || {
            let entry = cache.store(&request, &content)?;
            cache.record_miss(fetch_ms)?;
            Ok((entry, content))
        })
        .await?;

        tracing::debug!(reference, fetch_ms, size_bytes = entry.size_bytes, "fetched and cached document");
        Ok(FetchOutcome { entry, content, from_cache: false })
    }

    async fn cached(&self, reference: &str) -> Result<Option<FetchOutcome>, Error> {
        let cache = self.clone();
        let reference = reference.to_string();
        blocking(move || {
            let started = Instant::now();
            let lookup = cache.lookup(&reference)?;
            let Some(entry) = lookup.entry.filter(|_| lookup.fresh) else {
                return Ok(None);
            };
            let content = match cache.read_content(&entry) {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!(reference = %entry.reference, error = %err, "cached file unreadable; refetching");
                    return Ok(None);
                }
            };
            cache.record_hit(elapsed_ms(started))?;
            Ok(Some(FetchOutcome { entry, content, from_cache: true }))
        })
        .await
    }
}

async fn blocking<T: Send + 'static>(work: impl FnOnce() -> Result<T, Error> + Send + 'static) -> Result<T, Error> {
    tokio::task::spawn_blocking(work).await?
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
