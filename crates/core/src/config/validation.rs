//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::cache::entry::MAX_TTL_DAYS;
use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn check_percent(field: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must be between 0 and 100".into() });
    }
    Ok(())
}

fn check_base_url(raw: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid { field: "base_url".into(), reason };
    let url = Url::parse(raw.trim()).map_err(|e| invalid(format!("unparsable URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("URL has no host".into()));
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - a threshold percentage is outside 0-100
    /// - `default_ttl_days` exceeds ten years
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `base_url` is set but does not parse as an http(s) URL with a host
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_percent("thresholds.expired_ratio_percent", self.thresholds.expired_ratio_percent)?;
        check_percent("thresholds.hit_rate_percent", self.thresholds.hit_rate_percent)?;
        check_percent("thresholds.min_free_disk_percent", self.thresholds.min_free_disk_percent)?;

        if self.default_ttl_days > MAX_TTL_DAYS {
            return Err(ConfigError::Invalid {
                field: "default_ttl_days".into(),
                reason: format!("must not exceed {MAX_TTL_DAYS} days"),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.check_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "check_timeout_ms".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if let Some(base) = &self.base_url {
            check_base_url(base)?;
        }

        if self.required_tools.is_empty() {
            tracing::debug!("required_tools is empty; system health check will always pass");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_percent_out_of_range() {
        let config = AppConfig {
            thresholds: Thresholds { expired_ratio_percent: -1.0, ..Default::default() },
            ..Default::default()
        };
        let result = config.validate();
        assert!(
            matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "thresholds.expired_ratio_percent")
        );
    }

    #[test]
    fn test_validate_ttl_too_large() {
        let config = AppConfig { default_ttl_days: 3651, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "default_ttl_days"));
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_relative_base_url() {
        let config = AppConfig { base_url: Some("docs.example.com".into()), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "base_url"));
    }

    #[test]
    fn test_validate_unparsable_base_url() {
        for base in ["https://", "http://exa mple.com", "ftp://example.com/docs", "https://:80/docs"] {
            let config = AppConfig { base_url: Some(base.into()), ..Default::default() };
            let result = config.validate();
            assert!(
                matches!(result, Err(ConfigError::Invalid { ref field, .. }) if field == "base_url"),
                "{base} should be rejected"
            );
        }

        let config = AppConfig { base_url: Some("https://raw.example.com/docs/".into()), ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig {
            default_ttl_days: 0,
            max_bytes: 1,
            timeout_ms: 100,
            thresholds: Thresholds { hit_rate_percent: 100.0, expired_ratio_percent: 0.0, ..Default::default() },
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
