//! Test suites - ordered trees of cases

use crate::case::TestCase;
use crate::error::{validate_name, HarnessError, HarnessResult};

/// Separator between path segments of a qualified name
pub const PATH_SEPARATOR: &str = "::";

/// An entry of a suite: a case or a nested suite
#[derive(Debug, Clone)]
pub enum SuiteItem {
    Case(TestCase),
    Suite(TestSuite),
}

impl SuiteItem {
    pub fn name(&self) -> &str {
        match self {
            SuiteItem::Case(case) => case.name(),
            SuiteItem::Suite(suite) => suite.name(),
        }
    }
}

/// A named, ordered grouping of cases and nested suites
///
/// Insertion order is discovery order and is preserved everywhere: when
/// flattening for execution, when filtering, and when reporting.
#[derive(Debug, Clone, Default)]
pub struct TestSuite {
    name: String,
    items: Vec<SuiteItem>,
}

/// A case scheduled for execution, with its fully qualified name
#[derive(Debug, Clone)]
pub struct PlannedCase<'a> {
    /// `suite::nested::case`
    pub qualified_name: String,
    pub case: &'a TestCase,
}

impl TestSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    /// The unnamed root used by [`Registry`](crate::Registry)
    pub(crate) fn root() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[SuiteItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<SuiteItem> {
        self.items
    }

    /// Append a case; names must be unique among siblings
    pub fn add_case(&mut self, case: TestCase) -> HarnessResult<()> {
        validate_name(case.name())?;
        self.ensure_unique(case.name())?;
        self.items.push(SuiteItem::Case(case));
        Ok(())
    }

    /// Append several cases, stopping at the first invalid one
    pub fn add_cases(&mut self, cases: impl IntoIterator<Item = TestCase>) -> HarnessResult<()> {
        for case in cases {
            self.add_case(case)?;
        }
        Ok(())
    }

    /// Append a nested suite; names must be unique among siblings
    pub fn add_suite(&mut self, suite: TestSuite) -> HarnessResult<()> {
        validate_name(suite.name())?;
        self.ensure_unique(suite.name())?;
        self.items.push(SuiteItem::Suite(suite));
        Ok(())
    }

    /// Builder form of [`add_case`](Self::add_case)
    pub fn with_case(mut self, case: TestCase) -> HarnessResult<Self> {
        self.add_case(case)?;
        Ok(self)
    }

    /// Builder form of [`add_suite`](Self::add_suite)
    pub fn with_suite(mut self, suite: TestSuite) -> HarnessResult<Self> {
        self.add_suite(suite)?;
        Ok(self)
    }

    /// Nested suite with the given name, created at the end if missing
    pub fn suite_entry(&mut self, name: &str) -> HarnessResult<&mut TestSuite> {
        let position = self.items.iter().position(|item| item.name() == name);
        let index = match position {
            Some(index) => index,
            None => {
                self.add_suite(TestSuite::new(name))?;
                self.items.len() - 1
            }
        };
        let duplicate = self.duplicate(name);
        match &mut self.items[index] {
            SuiteItem::Suite(suite) => Ok(suite),
            SuiteItem::Case(_) => Err(duplicate),
        }
    }

    fn ensure_unique(&self, name: &str) -> HarnessResult<()> {
        if self.items.iter().any(|item| item.name() == name) {
            return Err(self.duplicate(name));
        }
        Ok(())
    }

    fn duplicate(&self, name: &str) -> HarnessError {
        HarnessError::DuplicateEntry {
            suite: self.display_name().to_string(),
            name: name.to_string(),
        }
    }

    fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "<root>"
        } else {
            &self.name
        }
    }

    /// Number of cases in this suite and all nested suites
    pub fn len(&self) -> usize {
        self.items
            .iter()
            .map(|item| match item {
                SuiteItem::Case(_) => 1,
                SuiteItem::Suite(suite) => suite.len(),
            })
            .sum()
    }

    /// Whether the tree holds no cases at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct nested suites
    pub fn suites(&self) -> impl Iterator<Item = &TestSuite> {
        self.items.iter().filter_map(|item| match item {
            SuiteItem::Suite(suite) => Some(suite),
            SuiteItem::Case(_) => None,
        })
    }

    /// Look up a nested suite by relative path (`a::b`)
    pub fn find(&self, path: &str) -> Option<&TestSuite> {
        let mut current = self;
        for segment in path.split(PATH_SEPARATOR) {
            current = current.suites().find(|s| s.name() == segment)?;
        }
        Some(current)
    }

    /// Depth-first, discovery-ordered list of cases with qualified names
    pub fn flatten(&self) -> Vec<PlannedCase<'_>> {
        let mut planned = Vec::with_capacity(self.len());
        self.flatten_into(&self.qualify(""), &mut planned);
        planned
    }

    /// Flatten with `prefix` as the path of this suite's parent
    pub(crate) fn flatten_under<'a>(&'a self, prefix: &str) -> Vec<PlannedCase<'a>> {
        let mut planned = Vec::with_capacity(self.len());
        self.flatten_into(&self.qualify(prefix), &mut planned);
        planned
    }

    fn flatten_into<'a>(&'a self, path: &str, planned: &mut Vec<PlannedCase<'a>>) {
        for item in &self.items {
            match item {
                SuiteItem::Case(case) => planned.push(PlannedCase {
                    qualified_name: join(path, case.name()),
                    case,
                }),
                SuiteItem::Suite(suite) => {
                    suite.flatten_into(&join(path, suite.name()), planned);
                }
            }
        }
    }

    fn qualify(&self, prefix: &str) -> String {
        join(prefix, &self.name)
    }

    /// New tree containing only the cases accepted by `predicate`
    ///
    /// The predicate receives the qualified name and the case. Relative order
    /// is preserved and suites left without cases are pruned. The suite itself
    /// is always returned, possibly empty.
    pub fn filter_by<P>(&self, predicate: P) -> TestSuite
    where
        P: Fn(&str, &TestCase) -> bool,
    {
        self.filter_with(&self.qualify(""), &predicate)
    }

    pub(crate) fn filter_with<P>(&self, path: &str, predicate: &P) -> TestSuite
    where
        P: Fn(&str, &TestCase) -> bool,
    {
        let mut filtered = TestSuite::new(self.name.clone());
        for item in &self.items {
            match item {
                SuiteItem::Case(case) => {
                    if predicate(&join(path, case.name()), case) {
                        filtered.items.push(SuiteItem::Case(case.clone()));
                    }
                }
                SuiteItem::Suite(suite) => {
                    let child = suite.filter_with(&join(path, suite.name()), predicate);
                    if !child.is_empty() {
                        filtered.items.push(SuiteItem::Suite(child));
                    }
                }
            }
        }
        filtered
    }

    /// Reorder cases within every suite using `order`
    pub(crate) fn reorder_with<F>(&mut self, order: &mut F)
    where
        F: FnMut(&mut [SuiteItem]),
    {
        order(&mut self.items);
        for item in &mut self.items {
            if let SuiteItem::Suite(suite) = item {
                suite.reorder_with(&mut *order);
            }
        }
    }
}

/// Join two path segments, skipping empty ones
pub(crate) fn join(prefix: &str, name: &str) -> String {
    match (prefix.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{}{}{}", prefix, PATH_SEPARATOR, name),
    }
}
