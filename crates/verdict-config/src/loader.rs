//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::project::{ProjectConfig, PROJECT_FILE};
use crate::{validate_format, validate_parallelism, validate_timeout, ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Worker count for parallel mode
pub const ENV_PARALLELISM: &str = "TEST_PARALLELISM";
/// Report format
pub const ENV_FORMAT: &str = "VERDICT_FORMAT";
/// Default per-case timeout in seconds
pub const ENV_TIMEOUT: &str = "VERDICT_TIMEOUT";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.verdict/config.toml) - lowest priority
/// 2. Project config (./verdict.toml) - overrides global
/// 3. Environment variables - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration, with environment overrides applied
    pub project: ProjectConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Project root directory (where verdict.toml was found)
    pub project_root: Option<PathBuf>,

    /// Directory the search started from
    pub start_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Read global defaults from `path` instead of the home directory
    pub fn with_global_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find verdict.toml, then loads and merges
    /// global config if it exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        let global_config = self.load_global_config()?;
        let project_config = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
            start_dir: start_dir.to_path_buf(),
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let global_config = self.load_global_config()?;
        let project_config = self.apply_env_overrides(project_config)?;

        let project_root = config_path.parent().map(|p| p.to_path_buf());
        let start_dir = project_root.clone().unwrap_or_default();

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
            start_dir,
        })
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_FILE);

            if config_path.is_file() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                // No verdict.toml anywhere up to the filesystem root
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Load global configuration; a missing file yields the defaults
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => match GlobalConfig::global_config_path() {
                Ok(path) => {
                    self.global_config_path = Some(path.clone());
                    path
                }
                // No home directory means no global config
                Err(ConfigError::HomeNotFound) => return Ok(GlobalConfig::default()),
                Err(e) => return Err(e),
            },
        };

        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides to project config
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Some(value) = env_value(ENV_PARALLELISM) {
            let parallelism = value
                .parse::<usize>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: ENV_PARALLELISM.to_string(),
                    reason: format!("'{}' is not a worker count: {}", value, e),
                })?;
            validate_parallelism(ENV_PARALLELISM, parallelism)?;
            config.run_mut().parallelism = Some(parallelism);
        }

        if let Some(value) = env_value(ENV_FORMAT) {
            let format = value.to_lowercase();
            validate_format(ENV_FORMAT, &format)?;
            config.run_mut().format = Some(format);
        }

        if let Some(value) = env_value(ENV_TIMEOUT) {
            let secs = value.parse::<f64>().map_err(|e| ConfigError::InvalidValue {
                field: ENV_TIMEOUT.to_string(),
                reason: format!("'{}' is not a number of seconds: {}", value, e),
            })?;
            validate_timeout(ENV_TIMEOUT, secs)?;
            config.run_mut().timeout_secs = Some(secs);
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-empty, trimmed value of an environment variable
fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Effective report format (project > global > "text")
    pub fn format(&self) -> &str {
        self.project
            .format()
            .or_else(|| self.global.default_format())
            .unwrap_or("text")
    }

    /// Effective worker count (project > global > 1)
    pub fn parallelism(&self) -> usize {
        self.project
            .parallelism()
            .or_else(|| self.global.default_parallelism())
            .unwrap_or(1)
    }

    /// Default per-case timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.project
            .timeout_secs()
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    pub fn fail_fast(&self) -> bool {
        self.project.fail_fast().unwrap_or(false)
    }

    pub fn shuffle_seed(&self) -> Option<u64> {
        self.project.shuffle_seed()
    }

    /// Colored output unless the user disabled it
    pub fn color(&self) -> bool {
        self.global.color().unwrap_or(true)
    }

    /// Directory to discover suites in
    ///
    /// `[discovery] root` resolved against the project root; without it, the
    /// project root itself, or the start directory outside a project.
    pub fn discovery_root(&self) -> PathBuf {
        let base = self.project_root.as_deref().unwrap_or(&self.start_dir);
        match self.project.discovery_root() {
            Some(root) => base.join(root),
            None => base.to_path_buf(),
        }
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if this is a project (has verdict.toml)
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}
