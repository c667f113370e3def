//! CLI configuration via environment variables
//!
//! Settings that only concern the binary itself. Run settings live in
//! `verdict.toml` and are loaded by `verdict_config`.

use std::env;
use std::ffi::OsString;

/// Environment variable holding the log filter
pub const ENV_LOG: &str = "VERDICT_LOG";

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Disable colored output (NO_COLOR set to a non-empty value)
    pub no_color: bool,
    /// Log filter directives (VERDICT_LOG=debug, VERDICT_LOG=verdict=trace)
    pub log_filter: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            no_color: disables_color(env::var_os("NO_COLOR")),
            log_filter: env::var(ENV_LOG).ok().filter(|v| !v.trim().is_empty()),
        }
    }

    /// Log filter to install: `VERDICT_LOG` wins, then the verbosity default
    pub fn log_directives(&self, verbose: bool) -> &str {
        match &self.log_filter {
            Some(filter) => filter,
            None if verbose => "debug",
            None => "warn",
        }
    }
}

/// NO_COLOR convention: present and not empty
fn disables_color(value: Option<OsString>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_color_convention() {
        assert!(disables_color(Some(OsString::from("1"))));
        assert!(disables_color(Some(OsString::from("true"))));
        assert!(!disables_color(Some(OsString::new())));
        assert!(!disables_color(None));
    }

    #[test]
    fn test_log_directives() {
        let config = Config {
            no_color: false,
            log_filter: None,
        };
        assert_eq!(config.log_directives(false), "warn");
        assert_eq!(config.log_directives(true), "debug");

        let config = Config {
            no_color: true,
            log_filter: Some("verdict=trace".to_string()),
        };
        assert_eq!(config.log_directives(false), "verdict=trace");
        assert_eq!(config.log_directives(true), "verdict=trace");
    }
}
