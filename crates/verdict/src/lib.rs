//! Verdict test-execution engine
//!
//! Provides the building blocks of a unit-test harness:
//! - Test cases with composable `before_each` / `after_each` hooks
//! - Suites that nest into an ordered tree
//! - A registry with selection and tag/name filtering
//! - A runner with per-case isolation, timeouts, fail-fast and parallel suites
//! - A reporter producing text or JSON output and a process exit code
//!
//! # Example
//!
//! ```no_run
//! use verdict::{check_eq, Registry, RunConfig, Runner, TestCase, TestSuite};
//!
//! let mut suite = TestSuite::new("math");
//! suite
//!     .add_case(TestCase::new("adds", |_ctx| {
//!         check_eq!(4, 2 + 2);
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! let mut registry = Registry::new();
//! registry.register(suite).unwrap();
//!
//! let report = Runner::new(RunConfig::default()).run(registry.root());
//! assert_eq!(verdict::exit_code(&report), 0);
//! ```

pub mod assert;
pub mod case;
pub mod error;
pub mod outcome;
pub mod registry;
pub mod report;
pub mod reporter;
pub mod runner;
pub mod suite;

pub use assert::AssertionFailure;
pub use case::{CaseContext, CaseError, CaseResult, TestCase};
pub use error::{HarnessError, HarnessResult};
pub use outcome::{ErrorKind, Outcome, OutcomeKind};
pub use registry::{Filter, Registry};
pub use report::{CaseRecord, Report};
pub use reporter::{exit_code, summarize, Format, Reporter, Summary};
pub use runner::{RunConfig, Runner};
pub use suite::{PlannedCase, SuiteItem, TestSuite};
