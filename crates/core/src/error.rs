//! Unified error types for codex-cache.
//!
//! Absence and expiry are not errors: lookups report them as typed results.
//! These variants cover the conditions a caller has to act on.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use std::path::PathBuf;

/// Unified error types for the cache and its front-ends.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A reference or file that was required is absent.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// The index file exists but is not valid JSON for the current schema.
    ///
    /// Recoverable with `DocCache::rebuild_index`.
    #[error("CORRUPT_INDEX: {path}: {reason}")]
    CorruptIndex { path: PathBuf, reason: String },

    /// Writing content or the index to disk failed.
    #[error("STORAGE_ERROR: {0}")]
    Storage(String),

    /// Invalid input parameters (empty reference, traversal, bad scope).
    #[error("VALIDATION_ERROR: {0}")]
    Validation(String),

    /// A health check crossed a failure threshold.
    #[error("THRESHOLD_EXCEEDED: {0}")]
    ThresholdExceeded(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// SSRF blocked - private/internal address not allowed.
    #[error("SSRF_BLOCKED: {0}")]
    SsrfBlocked(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// HTTP error response.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// A blocking cache task panicked or was cancelled.
    #[error("TASK_FAILED: {0}")]
    Task(String),
}

impl Error {
    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        Error::Storage(format!("{context}: {err}"))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Task(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::Validation(msg) => (-32602, msg.clone()),
            Error::NotFound(msg) => (-32001, msg.clone()),
            Error::CorruptIndex { .. } => (-32002, err.to_string()),
            Error::Storage(msg) => (-32002, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::SsrfBlocked(msg) => (-32004, msg.clone()),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::HttpError(msg) => (-32008, msg.clone()),
            Error::ThresholdExceeded(msg) => (-32013, msg.clone()),
            Error::Task(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("@codex/acme/readme.md".to_string());
        assert!(err.to_string().contains("NOT_FOUND"));
        assert!(err.to_string().contains("@codex/acme/readme.md"));
    }

    #[test]
    fn test_corrupt_index_display_includes_path() {
        let err = Error::CorruptIndex { path: PathBuf::from("/tmp/cache/index.json"), reason: "EOF".into() };
        let text = err.to_string();
        assert!(text.starts_with("CORRUPT_INDEX"));
        assert!(text.contains("index.json"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let mcp_err: McpError = Error::Validation("empty reference".to_string()).into();
        assert_eq!(mcp_err.code.0, -32602);

        let mcp_err: McpError = Error::Storage("disk full".to_string()).into();
        assert_eq!(mcp_err.code.0, -32002);
    }
}
