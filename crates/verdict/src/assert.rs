//! Assertion helpers
//!
//! Helpers return [`CaseResult`] so bodies can use `?`. The macros wrap them
//! and return early from the enclosing body.

use crate::case::{CaseError, CaseResult};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// The distinguished assertion error; the runner records it as `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionFailure {
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub message: String,
}

impl AssertionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            expected: None,
            actual: None,
            message: message.into(),
        }
    }

    /// Failure describing an expected/actual mismatch
    pub fn mismatch(
        expected: impl Into<String>,
        actual: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            expected: Some(expected.into()),
            actual: Some(actual.into()),
            message: message.into(),
        }
    }

    /// Panic with this failure as the payload
    ///
    /// For code that cannot return a [`CaseResult`]. The runner recognises the
    /// payload and still records the case as failed rather than errored.
    pub fn raise(self) -> ! {
        std::panic::panic_any(self)
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let (Some(expected), Some(actual)) = (&self.expected, &self.actual) {
            write!(f, " (expected: {}, actual: {})", expected, actual)?;
        }
        Ok(())
    }
}

impl std::error::Error for AssertionFailure {}

/// Assert that two values are equal
pub fn expect_eq<T: PartialEq + Debug>(expected: T, actual: T) -> CaseResult {
    if expected == actual {
        Ok(())
    } else {
        Err(CaseError::Assertion(AssertionFailure::mismatch(
            format!("{:?}", expected),
            format!("{:?}", actual),
            "values are not equal",
        )))
    }
}

/// Assert that two values differ
pub fn expect_ne<T: PartialEq + Debug>(unexpected: T, actual: T) -> CaseResult {
    if unexpected != actual {
        Ok(())
    } else {
        Err(CaseError::Assertion(AssertionFailure::mismatch(
            format!("anything but {:?}", unexpected),
            format!("{:?}", actual),
            "values are equal",
        )))
    }
}

pub fn expect_true(condition: bool, message: impl Into<String>) -> CaseResult {
    if condition {
        Ok(())
    } else {
        Err(CaseError::Assertion(AssertionFailure::mismatch(
            "true",
            "false",
            message,
        )))
    }
}

pub fn expect_false(condition: bool, message: impl Into<String>) -> CaseResult {
    expect_true(!condition, message)
}

/// Assert that `haystack` contains `needle`
pub fn expect_contains(haystack: &str, needle: &str) -> CaseResult {
    if haystack.contains(needle) {
        Ok(())
    } else {
        Err(CaseError::Assertion(AssertionFailure::mismatch(
            format!("text containing {:?}", needle),
            format!("{:?}", haystack),
            "substring not found",
        )))
    }
}

/// Fail unconditionally
pub fn fail(message: impl Into<String>) -> CaseResult {
    Err(CaseError::Assertion(AssertionFailure::new(message)))
}

/// Skip the case unless `condition` holds
pub fn assume(condition: bool, reason: impl Into<String>) -> CaseResult {
    if condition {
        Ok(())
    } else {
        Err(CaseError::Skip(reason.into()))
    }
}

/// Skip the case
pub fn skip(reason: impl Into<String>) -> CaseResult {
    Err(CaseError::Skip(reason.into()))
}

/// Return a failed assertion from the enclosing body unless the condition holds
#[macro_export]
macro_rules! check {
    ($cond:expr $(,)?) => {
        $crate::assert::expect_true($cond, concat!("check failed: ", stringify!($cond)))?
    };
    ($cond:expr, $($msg:tt)+) => {
        $crate::assert::expect_true($cond, format!($($msg)+))?
    };
}

/// Return a failed assertion from the enclosing body unless both values are equal
#[macro_export]
macro_rules! check_eq {
    ($expected:expr, $actual:expr $(,)?) => {
        $crate::assert::expect_eq($expected, $actual)?
    };
}

/// Return a failed assertion from the enclosing body if both values are equal
#[macro_export]
macro_rules! check_ne {
    ($unexpected:expr, $actual:expr $(,)?) => {
        $crate::assert::expect_ne($unexpected, $actual)?
    };
}

/// Skip the enclosing case unless the assumption holds
#[macro_export]
macro_rules! assume {
    ($cond:expr $(,)?) => {
        $crate::assert::assume($cond, concat!("assumption failed: ", stringify!($cond)))?
    };
    ($cond:expr, $($msg:tt)+) => {
        $crate::assert::assume($cond, format!($($msg)+))?
    };
}
