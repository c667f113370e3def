//! Harness-level errors
//!
//! Failures inside a single case never surface here; they are captured as an
//! [`Outcome`](crate::Outcome). Only problems that must stop a run before any
//! case executes are reported through [`HarnessError`].

use thiserror::Error;

/// Errors raised while building or selecting a suite tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HarnessError {
    #[error("a suite named '{0}' is already registered")]
    DuplicateSuite(String),

    #[error("suite '{suite}' already contains an entry named '{name}'")]
    DuplicateEntry { suite: String, name: String },

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

impl HarnessError {
    /// Whether this error stems from user configuration (selector, filter, format)
    pub fn is_configuration(&self) -> bool {
        matches!(self, HarnessError::Configuration(_))
    }
}

/// Validate a suite or case name
///
/// Names must be non-empty and may not contain the `::` path separator.
pub(crate) fn validate_name(name: &str) -> HarnessResult<()> {
    if name.trim().is_empty() {
        return Err(HarnessError::InvalidName {
            name: name.to_string(),
            reason: "name cannot be empty".to_string(),
        });
    }
    if name.contains(crate::suite::PATH_SEPARATOR) {
        return Err(HarnessError::InvalidName {
            name: name.to_string(),
            reason: format!("name cannot contain '{}'", crate::suite::PATH_SEPARATOR),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("adds_numbers").is_ok());
        assert!(validate_name("case[3]").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("a::b").is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = HarnessError::DuplicateSuite("math".to_string());
        assert_eq!(err.to_string(), "a suite named 'math' is already registered");
        assert!(!err.is_configuration());

        let err = HarnessError::Configuration("no suite matches 'nope'".to_string());
        assert!(err.is_configuration());
        assert!(err.to_string().contains("nope"));
    }
}
