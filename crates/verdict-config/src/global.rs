//! Global Configuration (~/.verdict/config.toml)
//!
//! Handles user-level defaults stored in `~/.verdict/config.toml`.

use crate::{validate_format, validate_parallelism, ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.verdict/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Default report format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Default worker count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<usize>,

    /// Colored terminal output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(defaults) = &self.defaults {
            if let Some(format) = &defaults.format {
                validate_format("defaults.format", format)?;
            }
            if let Some(parallelism) = defaults.parallelism {
                validate_parallelism("defaults.parallelism", parallelism)?;
            }
        }
        Ok(())
    }

    /// Get the global config file path (~/.verdict/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".verdict").join("config.toml"))
    }

    pub fn default_format(&self) -> Option<&str> {
        self.defaults.as_ref().and_then(|d| d.format.as_deref())
    }

    pub fn default_parallelism(&self) -> Option<usize> {
        self.defaults.as_ref().and_then(|d| d.parallelism)
    }

    pub fn color(&self) -> Option<bool> {
        self.defaults.as_ref().and_then(|d| d.color)
    }
}
