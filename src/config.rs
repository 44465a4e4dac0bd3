use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

use crate::scenarios::Scenario;

pub const MAX_COPIES: usize = 1024;

// =============================================================================
// Errors
// =============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Value {value} for field '{field}' is out of range (min: {min}, max: {max})")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },
}

impl ConfigError {
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Demo configuration
// =============================================================================

/// DemoConfig: settings for the `holders-demo` driver, all optional in TOML
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    pub initial_value: i64,
    pub copies: usize,
    pub log_level: String,
    pub color: bool,
    pub scenario: Scenario,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            initial_value: 1,
            copies: 4,
            log_level: "info".to_string(),
            color: true,
            scenario: Scenario::All,
        }
    }
}

impl DemoConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: DemoConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.copies > MAX_COPIES {
            return Err(ConfigError::OutOfRange {
                field: "copies".to_string(),
                value: self.copies as i64,
                min: 0,
                max: MAX_COPIES as i64,
            });
        }
        self.level_filter()?;
        Ok(())
    }

    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.log_level).map_err(|_| {
            ConfigError::invalid_value(
                "log_level",
                format!("'{}' is not one of off, error, warn, info, debug, trace", self.log_level),
            )
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
