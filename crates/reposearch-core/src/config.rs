//! Configuration management for reposearch
//!
//! This module provides a centralized configuration system that supports:
//! - YAML configuration files
//! - Environment variable overrides
//! - Reasonable defaults
//! - Configuration validation

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure for reposearch
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SearchConfig {
    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub index: IndexConfig,
}

impl SearchConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. Config file specified by REPOSEARCH_CONFIG env var
    /// 3. ./config/reposearch.yaml
    /// 4. /etc/reposearch/reposearch.yaml
    /// 5. Hardcoded defaults (lowest priority)
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        builder = Self::set_defaults(builder)?;

        if let Ok(config_path) = std::env::var("REPOSEARCH_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder
            .add_source(File::with_name("./config/reposearch").required(false))
            .add_source(File::with_name("/etc/reposearch/reposearch").required(false));

        // Example: REPOSEARCH_QUERY__CASE_SENSITIVE=false
        builder = builder.add_source(
            Environment::with_prefix("REPOSEARCH")
                .separator("__")
                .try_parsing(true),
        );

        let config: SearchConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Set default values for all configuration options
    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("query.case_sensitive", true)?
            .set_default("query.validate_columns", true)?
            .set_default("query.cache_capacity", 1024)?
            .set_default("query.cache_idle_secs", 300)?
            .set_default("index.max_batch_size", 10_000)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.cache_capacity == 0 {
            return Err(ConfigError::Message(
                "query.cache_capacity must be > 0".to_string(),
            ));
        }

        if self.index.max_batch_size == 0 {
            return Err(ConfigError::Message(
                "index.max_batch_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from a specific file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: SearchConfig = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }
}

/// Query compiler configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Compare text values case-sensitively unless the query lower/upper-cases them
    #[serde(default = "default_true")]
    pub case_sensitive: bool,

    /// Reject property references that are not columns of the selector's table
    #[serde(default = "default_true")]
    pub validate_columns: bool,

    /// Maximum number of compiled queries kept in the cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,

    /// Seconds a cached compiled query may stay unused before eviction
    #[serde(default = "default_cache_idle_secs")]
    pub cache_idle_secs: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            validate_columns: true,
            cache_capacity: default_cache_capacity(),
            cache_idle_secs: default_cache_idle_secs(),
        }
    }
}

impl QueryConfig {
    /// Convert the cache idle timeout to Duration
    pub fn cache_idle(&self) -> Duration {
        Duration::from_secs(self.cache_idle_secs)
    }
}

/// Reference index configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Largest number of added entries accepted in one update batch
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_cache_capacity() -> u64 {
    1024
}

const fn default_cache_idle_secs() -> u64 {
    300
}

const fn default_max_batch_size() -> usize {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_configuration() {
        let config = SearchConfig::default();

        assert!(config.query.case_sensitive);
        assert!(config.query.validate_columns);
        assert_eq!(config.query.cache_capacity, 1024);
        assert_eq!(config.query.cache_idle().as_secs(), 300);
        assert_eq!(config.index.max_batch_size, 10_000);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = SearchConfig::default();

        config.query.cache_capacity = 0;
        assert!(config.validate().is_err());

        config.query.cache_capacity = 16;
        assert!(config.validate().is_ok());

        config.index.max_batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(file, "query:\n  case_sensitive: false\n  cache_capacity: 8").unwrap();

        let config = SearchConfig::from_file(file.path()).unwrap();
        assert!(!config.query.case_sensitive);
        assert_eq!(config.query.cache_capacity, 8);
        assert!(config.query.validate_columns);
        assert_eq!(config.index.max_batch_size, 10_000);
    }
}
