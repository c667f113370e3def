//! Outcome model - the classified result of executing one case

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of an errored case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// An error returned by the body or a hook, labelled with its kind
    Uncaught(String),
    /// The body or a hook panicked
    Panic,
    /// The body did not complete within its timeout
    TimeoutExceeded,
}

impl ErrorKind {
    /// Name used when matching expected errors and in reports
    pub fn name(&self) -> &str {
        match self {
            ErrorKind::Uncaught(kind) => kind,
            ErrorKind::Panic => "panic",
            ErrorKind::TimeoutExceeded => "timeout_exceeded",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of running a single case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Case completed without error
    Passed,
    /// An assertion did not hold
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        expected: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        actual: Option<String>,
        message: String,
    },
    /// The case raised something other than an assertion failure
    Errored {
        kind: ErrorKind,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stack_summary: Option<String>,
    },
    /// The case was not run to completion on purpose
    Skipped { reason: String },
}

/// Discriminant of an [`Outcome`], handy for comparisons that ignore details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Passed,
    Failed,
    Errored,
    Skipped,
}

impl Outcome {
    /// Create a failed outcome; an empty message is replaced by a default
    pub fn failed(
        expected: Option<String>,
        actual: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        let message = non_empty(message.into(), "assertion failed");
        Outcome::Failed {
            expected,
            actual,
            message,
        }
    }

    /// Create an errored outcome; an empty message falls back to the kind name
    pub fn errored(kind: ErrorKind, message: impl Into<String>) -> Self {
        let fallback = format!("{} error", kind.name());
        Outcome::Errored {
            message: non_empty(message.into(), &fallback),
            kind,
            stack_summary: None,
        }
    }

    /// Attach a stack summary to an errored outcome
    pub fn with_stack_summary(mut self, summary: Option<String>) -> Self {
        if let Outcome::Errored { stack_summary, .. } = &mut self {
            *stack_summary = summary.filter(|s| !s.is_empty());
        }
        self
    }

    /// Create a skipped outcome
    pub fn skipped(reason: impl Into<String>) -> Self {
        Outcome::Skipped {
            reason: non_empty(reason.into(), "skipped"),
        }
    }

    /// Errored outcome for a case that exceeded its timeout
    pub fn timed_out(limit: std::time::Duration) -> Self {
        Outcome::errored(
            ErrorKind::TimeoutExceeded,
            format!("exceeded timeout of {:.2?}", limit),
        )
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Passed => OutcomeKind::Passed,
            Outcome::Failed { .. } => OutcomeKind::Failed,
            Outcome::Errored { .. } => OutcomeKind::Errored,
            Outcome::Skipped { .. } => OutcomeKind::Skipped,
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    pub fn is_errored(&self) -> bool {
        matches!(self, Outcome::Errored { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped { .. })
    }

    /// Failed or errored - the outcomes that make a run unsuccessful
    pub fn is_failure(&self) -> bool {
        self.is_failed() || self.is_errored()
    }

    /// Whether this outcome is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Outcome::Errored {
                kind: ErrorKind::TimeoutExceeded,
                ..
            }
        )
    }

    /// Message or reason carried by the outcome, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Passed => None,
            Outcome::Failed { message, .. } => Some(message),
            Outcome::Errored { message, .. } => Some(message),
            Outcome::Skipped { reason } => Some(reason),
        }
    }

    /// Short uppercase label used by the text reporter
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "PASS",
            Outcome::Failed { .. } => "FAIL",
            Outcome::Errored { .. } => "ERROR",
            Outcome::Skipped { .. } => "SKIP",
        }
    }
}

fn non_empty(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}
