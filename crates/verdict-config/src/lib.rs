//! Verdict Configuration System
//!
//! Configuration for test runs, layered in the following order (later
//! overrides earlier):
//! 1. Global config (~/.verdict/config.toml)
//! 2. Project config (verdict.toml, found by walking up from the working directory)
//! 3. Environment variables (TEST_PARALLELISM, VERDICT_FORMAT, VERDICT_TIMEOUT)
//! 4. CLI flags (applied by the caller)
//!
//! # Example
//!
//! ```no_run
//! use verdict_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("running with {} workers", config.parallelism());
//! ```

pub mod global;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Report formats accepted in configuration files and the environment
pub const FORMATS: &[&str] = &["text", "json"];

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

pub(crate) fn validate_format(field: &str, format: &str) -> ConfigResult<()> {
    if FORMATS.contains(&format) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("unknown format '{}' (expected 'text' or 'json')", format),
        })
    }
}

pub(crate) fn validate_parallelism(field: &str, parallelism: usize) -> ConfigResult<()> {
    if parallelism == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn validate_timeout(field: &str, secs: f64) -> ConfigResult<()> {
    if !secs.is_finite() || secs <= 0.0 || Duration::try_from_secs_f64(secs).is_err() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!(
                "timeout must be a positive, representable number of seconds, got {}",
                secs
            ),
        });
    }
    Ok(())
}

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader};
pub use project::ProjectConfig;
