//! Reference → URL resolution and URL canonicalization.

use url::Url;

use codex_cache_core::cache::reference::PROJECT_NAMESPACE;

/// Error type for reference resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("no base URL configured for project reference {0}")]
    MissingBaseUrl(String),

    #[error("reference is neither a URL nor an @codex/ reference: {0}")]
    UnsupportedReference(String),
}

/// Canonicalize a URL string.
///
/// Trims whitespace, defaults the scheme to `https`, lowercases the host and
/// drops the fragment. The query string is kept as is.
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let with_scheme = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };
    let mut parsed = Url::parse(&with_scheme).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(UrlError::UnsupportedScheme(parsed.scheme().to_string()));
    }
    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed.set_host(Some(&host)).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Turn a cache reference into the URL it is fetched from.
///
/// - `http://…` / `https://…` are used directly.
/// - `@codex/{project}/{path}` is joined onto `base_url` as `{base_url}/{project}/{path}`.
pub fn resolve_reference(reference: &str, base_url: Option<&Url>) -> Result<Url, UrlError> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return canonicalize(trimmed);
    }

    let Some(rest) = trimmed.strip_prefix(PROJECT_NAMESPACE).and_then(|r| r.strip_prefix('/')) else {
        return Err(UrlError::UnsupportedReference(trimmed.to_string()));
    };
    let base = base_url.ok_or_else(|| UrlError::MissingBaseUrl(trimmed.to_string()))?;

    let joined = format!("{}/{}", base.as_str().trim_end_matches('/'), rest.trim_start_matches('/'));
    canonicalize(&joined)
}
