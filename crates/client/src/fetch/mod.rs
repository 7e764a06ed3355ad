//! HTTP document source with SSRF protection and size/time limits.
//!
//! ### Reference resolution
//! - `http(s)://…` references are fetched directly
//! - `@codex/{project}/{path}` is joined onto the configured base URL
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments
//! - Preserve query string
//!
//! ### SSRF & Safety Gates
//! - Deny private ranges (RFC1918, link-local, localhost, etc.)
//! - Resolve DNS and validate all A/AAAA answers are public.
//! - Max redirects: 5, private IP-literal redirect targets refused
//! - Max body bytes: 5MB (configurable)

pub mod ssrf;
pub mod url;

use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::{Client, Response, header, redirect};
use std::time::{Duration, Instant};

pub use self::ssrf::{SsrfError, ensure_public_host, validate_ip};
pub use self::url::{UrlError, canonicalize, resolve_reference};

use codex_cache_core::{AppConfig, DocumentSource, Error, FetchedDocument};

/// Configuration for [`HttpSource`].
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// User agent string (default: "codex-cache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Base URL for `@codex/` references.
    pub base_url: Option<::url::Url>,

    /// Skip the SSRF gate (local mirrors, tests).
    pub allow_private_hosts: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            user_agent: "codex-cache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            base_url: None,
            allow_private_hosts: false,
        }
    }
}

impl SourceConfig {
    /// Derive the fetch settings from application config.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|raw| canonicalize(raw).map_err(|e| Error::InvalidUrl(format!("base_url: {e}"))))
            .transpose()?;

        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            base_url,
            allow_private_hosts: config.allow_private_hosts,
            ..Self::default()
        })
    }
}

/// Fetches documents over HTTP(S) for the cache.
pub struct HttpSource {
    http: Client,
    config: SourceConfig,
}

impl HttpSource {
    /// Create a new source with the given configuration.
    pub fn new(config: SourceConfig) -> Result<Self, Error> {
        let max_redirects = config.max_redirects;
        let guard_redirects = !config.allow_private_hosts;
        let policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= max_redirects {
                attempt.error(format!("more than {max_redirects} redirects"))
            } else if guard_redirects && ssrf::is_blocked_literal(attempt.url()) {
                let target = attempt.url().to_string();
                attempt.error(format!("redirect to private address {target}"))
            } else {
                attempt.follow()
            }
        });

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(policy)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        Self::new(SourceConfig::from_app_config(config)?)
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Resolve `reference` to the URL it will be fetched from.
    pub fn resolve(&self, reference: &str) -> Result<::url::Url, Error> {
        resolve_reference(reference, self.config.base_url.as_ref()).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    async fn read_limited(&self, mut response: Response) -> Result<Vec<u8>, Error> {
        let max = self.config.max_bytes;
        if let Some(len) = response.content_length()
            && len > max as u64
        {
            return Err(Error::FetchTooLarge(format!("{len} bytes exceeds {max}")));
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(map_reqwest)? {
            if body.len() + chunk.len() > max {
                return Err(Error::FetchTooLarge(format!("body exceeds {max} bytes")));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.to_vec())
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn fetch(&self, reference: &str) -> Result<FetchedDocument, Error> {
        let start = Instant::now();
        let url = self.resolve(reference)?;

        if !self.config.allow_private_hosts {
            ensure_public_host(&url, self.config.timeout)
                .await
                .map_err(|e| Error::SsrfBlocked(e.to_string()))?;
        }

        let response = self
            .http
            .get(url.as_str())
            .header(header::ACCEPT, "text/markdown,text/plain;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpError(format!("status {} for {url}", status.as_u16())));
        }
        let final_url = response.url().clone();
        let bytes = self.read_limited(response).await?;

        tracing::debug!(
            reference,
            url = %url,
            final_url = %final_url,
            fetch_ms = start.elapsed().as_millis() as u64,
            size_bytes = bytes.len(),
            "fetched document"
        );

        let source = url.host_str().unwrap_or("unknown").to_string();
        Ok(FetchedDocument { bytes, source })
    }
}

fn map_reqwest(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(err.to_string())
    } else if err.is_redirect() {
        Error::SsrfBlocked(format!("redirect refused: {err}"))
    } else {
        Error::HttpError(format!("network error: {err}"))
    }
}
