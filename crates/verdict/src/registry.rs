//! Registry - the root of all registered suites, with selection and filtering

use crate::case::TestCase;
use crate::error::{HarnessError, HarnessResult};
use crate::suite::{SuiteItem, TestSuite, PATH_SEPARATOR};
use std::collections::BTreeSet;

/// Selectors that choose every registered suite
const SELECT_ALL: &[&str] = &["", "*", "all"];

/// Holds every registered suite in registration order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    root: TestSuite,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            root: TestSuite::root(),
        }
    }

    /// Register a top-level suite
    pub fn register(&mut self, suite: TestSuite) -> HarnessResult<()> {
        if self.root.items().iter().any(|item| item.name() == suite.name()) {
            return Err(HarnessError::DuplicateSuite(suite.name().to_string()));
        }
        self.root.add_suite(suite)
    }

    /// Unnamed root suite holding every registered suite
    pub fn root(&self) -> &TestSuite {
        &self.root
    }

    /// Number of registered cases
    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Names of the registered suites, in registration order
    pub fn suite_names(&self) -> Vec<&str> {
        self.root
            .items()
            .iter()
            .filter(|item| matches!(item, SuiteItem::Suite(_)))
            .map(SuiteItem::name)
            .collect()
    }

    /// Restrict the tree to one suite path such as `parser::dialects`
    ///
    /// `*`, `all` and the empty selector select everything. The result keeps
    /// the ancestor chain of the selected suite, so qualified names are the
    /// same as in the full tree.
    pub fn select(&self, selector: &str) -> HarnessResult<TestSuite> {
        let selector = selector.trim();
        if SELECT_ALL.contains(&selector) {
            return Ok(self.root.clone());
        }

        let target = self.root.find(selector).ok_or_else(|| {
            HarnessError::Configuration(format!("no suite matches selector '{}'", selector))
        })?;

        // Rebuild the ancestor chain around a clone of the target
        let segments: Vec<&str> = selector.split(PATH_SEPARATOR).collect();
        let mut selected = target.clone();
        for ancestor in segments.iter().rev().skip(1) {
            selected = TestSuite::new(*ancestor).with_suite(selected)?;
        }
        TestSuite::root().with_suite(selected)
    }

    /// New tree containing only the cases accepted by `filter`
    pub fn filter(&self, filter: &Filter) -> TestSuite {
        filter.apply(&self.root)
    }
}

/// Case filter over tags and qualified names
///
/// A case matches when it carries at least one of `tags` (if any are set),
/// carries none of `exclude_tags`, and its qualified name contains `pattern`
/// (if set).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub tags: BTreeSet<String>,
    pub exclude_tags: BTreeSet<String>,
    pub pattern: Option<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn without_tag(mut self, tag: impl Into<String>) -> Self {
        self.exclude_tags.insert(tag.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Whether the filter accepts everything
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.exclude_tags.is_empty() && self.pattern.is_none()
    }

    pub fn matches(&self, qualified_name: &str, case: &TestCase) -> bool {
        if !self.tags.is_empty() && !self.tags.iter().any(|tag| case.has_tag(tag)) {
            return false;
        }
        if self.exclude_tags.iter().any(|tag| case.has_tag(tag)) {
            return false;
        }
        match &self.pattern {
            Some(pattern) => qualified_name.contains(pattern.as_str()),
            None => true,
        }
    }

    /// Apply the filter to a suite tree
    pub fn apply(&self, suite: &TestSuite) -> TestSuite {
        suite.filter_by(|name, case| self.matches(name, case))
    }
}
