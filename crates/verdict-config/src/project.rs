//! Project Configuration (verdict.toml)
//!
//! Handles project-level configuration stored in `verdict.toml` at the project root.

use crate::{validate_format, validate_parallelism, validate_timeout, ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name searched for when locating a project
pub const PROJECT_FILE: &str = "verdict.toml";

/// Project configuration from verdict.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Run settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunSection>,

    /// Suite discovery settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery: Option<DiscoverySection>,
}

/// `[run]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    /// Default per-case timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,

    /// Stop after the first failing case
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,

    /// Report format ("text" or "json")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Worker threads for parallel suites
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<usize>,

    /// Seed for shuffling case order within suites
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shuffle_seed: Option<u64>,
}

/// `[discovery]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DiscoverySection {
    /// Directory holding `*.suite.toml` files, relative to the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration text; `path` is used for error messages
    pub fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(run) = &self.run {
            if let Some(format) = &run.format {
                validate_format("run.format", format)?;
            }
            if let Some(parallelism) = run.parallelism {
                validate_parallelism("run.parallelism", parallelism)?;
            }
            if let Some(secs) = run.timeout_secs {
                validate_timeout("run.timeout_secs", secs)?;
            }
        }

        if let Some(root) = self.discovery.as_ref().and_then(|d| d.root.as_ref()) {
            if root.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "discovery.root".to_string(),
                    reason: "path cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Mutable `[run]` section, created when missing
    pub fn run_mut(&mut self) -> &mut RunSection {
        self.run.get_or_insert_with(RunSection::default)
    }

    pub fn timeout_secs(&self) -> Option<f64> {
        self.run.as_ref().and_then(|r| r.timeout_secs)
    }

    pub fn fail_fast(&self) -> Option<bool> {
        self.run.as_ref().and_then(|r| r.fail_fast)
    }

    pub fn format(&self) -> Option<&str> {
        self.run.as_ref().and_then(|r| r.format.as_deref())
    }

    pub fn parallelism(&self) -> Option<usize> {
        self.run.as_ref().and_then(|r| r.parallelism)
    }

    pub fn shuffle_seed(&self) -> Option<u64> {
        self.run.as_ref().and_then(|r| r.shuffle_seed)
    }

    pub fn discovery_root(&self) -> Option<&Path> {
        self.discovery.as_ref().and_then(|d| d.root.as_deref())
    }
}
