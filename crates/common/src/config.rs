use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

// Default constants
pub const DEFAULT_TABLE_NAME: &str = "tweets";
pub const DEFAULT_ENDPOINT: &str = "http://search.twitter.com/search.json";
pub const DEFAULT_SEARCH_COLUMN: &str = "q";
pub const DEFAULT_MAX_RESULTS: usize = 512;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("chirp/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_LOG_FILTER: &str = "info";

pub const ENV_PREFIX: &str = "CHIRP";

/// What a scan does when the remote fetch fails or returns an unusable body.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail the query.
    #[default]
    Error,
    /// Log a warning and produce zero rows.
    Empty,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct SearchSourceConfig {
    /// Table name the source is registered under
    #[serde(default = "default_table_name")]
    #[validate(length(min = 1))]
    pub name: String,

    #[serde(default = "default_endpoint")]
    #[validate(url)]
    pub endpoint: String,

    /// Column whose equality predicate becomes the remote search term
    #[serde(default = "default_search_column")]
    #[validate(length(min = 1))]
    pub search_column: String,

    /// Upper bound on records accepted from a single response
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1))]
    pub max_results: usize,

    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub on_fetch_failure: FailurePolicy,
}

impl SearchSourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SearchSourceConfig {
    fn default() -> Self {
        Self {
            name: default_table_name(),
            endpoint: default_endpoint(),
            search_column: default_search_column(),
            max_results: default_max_results(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            on_fetch_failure: FailurePolicy::default(),
        }
    }
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_search_column() -> String {
    DEFAULT_SEARCH_COLUMN.to_string()
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

#[derive(Debug, Deserialize, Default, Clone, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub search: SearchSourceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from an optional YAML file, then apply `CHIRP__SECTION__KEY`
    /// environment overrides (e.g. `CHIRP__SEARCH__TIMEOUT_SECS=5`).
    pub fn from_file(path: &str) -> Result<Self> {
        let builder = config::Config::builder();

        let builder = if std::path::Path::new(path).exists() {
            builder.add_source(config::File::with_name(path))
        } else {
            tracing::debug!("Config file {} not found, using defaults", path);
            builder
        };

        let builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build().context("Failed to build configuration")?;

        let app_config: AppConfig = cfg
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

        Ok(app_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.search_column, "q");
        assert_eq!(config.search.max_results, 512);
        assert_eq!(config.search.on_fetch_failure, FailurePolicy::Error);
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let config = SearchSourceConfig {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let config = AppConfig {
            search: SearchSourceConfig {
                max_results: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_conversion() {
        let config = SearchSourceConfig {
            timeout_secs: 7,
            ..Default::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(7));
    }
}
