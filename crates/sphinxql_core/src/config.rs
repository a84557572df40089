//! Process-wide search configuration.
//!
//! # Responsibility
//! - Hold the settings shared by query compilation, execution and the
//!   daemon client collaborator.
//! - Validate settings once, before any query object is built.
//!
//! # Invariants
//! - Configuration is immutable after `SearchContext` construction.
//! - `document_id_shift` must equal the shift used by index generation.

use crate::codec::{DocumentIdCodec, DEFAULT_DOCUMENT_ID_SHIFT};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid search config `{}`: {}", self.field, self.message)
    }
}

impl Error for ConfigError {}

/// Search settings read once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Low bits of a document id reserved for the local record id.
    pub document_id_shift: u32,
    /// Ceiling applied to the daemon-reported total when counting.
    pub max_matches: u64,
    /// Page size of a fresh query.
    pub default_limit: u64,
    /// Whether fresh queries fetch excerpts for every result row.
    pub passages: bool,
    pub host: String,
    pub port: u16,
    /// Extra attempts the client layer makes after a connection failure.
    pub retries: u32,
    pub retry_delay_secs: u64,
    /// Reject range exclusion instead of warning and emitting `NOT ... BETWEEN`.
    pub strict_range_exclude: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            document_id_shift: DEFAULT_DOCUMENT_ID_SHIFT,
            max_matches: 1000,
            default_limit: 20,
            passages: false,
            host: "127.0.0.1".to_string(),
            port: 9306,
            retries: 0,
            retry_delay_secs: 5,
            strict_range_exclude: false,
        }
    }
}

impl SearchConfig {
    /// Checks value ranges and returns the identifier codec for this config.
    ///
    /// # Errors
    /// - Returns an error for a shift outside 1..=31.
    /// - Returns an error for zero `max_matches` or `default_limit`.
    /// - Returns an error for an empty `host`.
    pub fn validate(&self) -> Result<DocumentIdCodec, ConfigError> {
        if self.max_matches == 0 {
            return Err(ConfigError {
                field: "max_matches",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.default_limit == 0 {
            return Err(ConfigError {
                field: "default_limit",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError {
                field: "host",
                message: "cannot be empty".to_string(),
            });
        }
        DocumentIdCodec::new(self.document_id_shift).map_err(|err| ConfigError {
            field: "document_id_shift",
            message: err.to_string(),
        })
    }

    /// Daemon address in `host:port` form.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host.trim(), self.port)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Logging bootstrap settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rotating log files; stderr when unset.
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SearchConfig;

    #[test]
    fn defaults_are_valid() {
        let config = SearchConfig::default();
        let codec = config.validate().expect("defaults should validate");
        assert_eq!(codec.shift(), 24);
        assert_eq!(config.address(), "127.0.0.1:9306");
    }

    #[test]
    fn validate_rejects_zero_max_matches() {
        let config = SearchConfig {
            max_matches: 0,
            ..SearchConfig::default()
        };
        let err = config.validate().expect_err("zero max_matches must fail");
        assert_eq!(err.field, "max_matches");
    }

    #[test]
    fn validate_rejects_bad_shift() {
        let config = SearchConfig {
            document_id_shift: 40,
            ..SearchConfig::default()
        };
        let err = config.validate().expect_err("shift 40 must fail");
        assert_eq!(err.field, "document_id_shift");
    }
}
