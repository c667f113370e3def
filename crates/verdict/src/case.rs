//! Test cases, their hooks and the per-case execution context

use crate::assert::AssertionFailure;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Why a body or hook did not complete normally
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseError {
    /// An assertion did not hold
    Assertion(AssertionFailure),
    /// The case asked to be skipped
    Skip(String),
    /// Any other error, labelled with a kind such as `io` or `spawn`
    Uncaught {
        kind: String,
        message: String,
        causes: Vec<String>,
    },
    /// The case observed its cancellation flag at a checkpoint
    Cancelled,
}

impl CaseError {
    pub fn uncaught(kind: impl Into<String>, message: impl Into<String>) -> Self {
        CaseError::Uncaught {
            kind: kind.into(),
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Build an uncaught error from any error value, keeping its source chain
    pub fn from_error(kind: impl Into<String>, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        CaseError::Uncaught {
            kind: kind.into(),
            message: error.to_string(),
            causes,
        }
    }
}

impl fmt::Display for CaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseError::Assertion(failure) => write!(f, "{}", failure),
            CaseError::Skip(reason) => write!(f, "skipped: {}", reason),
            CaseError::Uncaught { kind, message, .. } => write!(f, "{}: {}", kind, message),
            CaseError::Cancelled => f.write_str("cancelled"),
        }
    }
}

impl From<AssertionFailure> for CaseError {
    fn from(failure: AssertionFailure) -> Self {
        CaseError::Assertion(failure)
    }
}

impl From<std::io::Error> for CaseError {
    fn from(error: std::io::Error) -> Self {
        CaseError::from_error("io", &error)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CaseError {
    fn from(error: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CaseError::from_error("error", error.as_ref())
    }
}

/// Result returned by case bodies and hooks
pub type CaseResult = Result<(), CaseError>;

/// Synchronous body or hook
pub type Hook = Arc<dyn Fn(&CaseContext) -> CaseResult + Send + Sync>;

/// Boxed future returned by async bodies
pub type BoxFuture = Pin<Box<dyn Future<Output = CaseResult> + Send>>;

/// Async body; receives its own handle to the context
pub type AsyncBody = Arc<dyn Fn(CaseContext) -> BoxFuture + Send + Sync>;

/// Executable part of a case
#[derive(Clone)]
pub enum Body {
    Sync(Hook),
    Async(AsyncBody),
}

/// Per-case execution context
///
/// Cheap to clone; every clone refers to the same cancellation flag and
/// scratch directory. A fresh context is created for each case, so nothing
/// stored here leaks into sibling cases.
#[derive(Clone)]
pub struct CaseContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    name: String,
    cancelled: AtomicBool,
    scratch: Mutex<Option<TempDir>>,
}

impl CaseContext {
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                name: qualified_name.into(),
                cancelled: AtomicBool::new(false),
                scratch: Mutex::new(None),
            }),
        }
    }

    /// Qualified name of the running case
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether the runner asked this case to stop
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Cooperative cancellation point
    ///
    /// Returns `Err(CaseError::Cancelled)` once the case has been cancelled,
    /// so long-running bodies can write `ctx.checkpoint()?` inside loops.
    pub fn checkpoint(&self) -> CaseResult {
        if self.is_cancelled() {
            Err(CaseError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub(crate) fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    /// Scratch directory owned by this case, created on first use
    ///
    /// The directory is deleted after `after_each` has run.
    pub fn temp_dir(&self) -> std::io::Result<PathBuf> {
        let mut scratch = self.inner.scratch.lock();
        if let Some(dir) = scratch.as_ref() {
            return Ok(dir.path().to_path_buf());
        }
        let dir = tempfile::Builder::new().prefix("verdict-").tempdir()?;
        let path = dir.path().to_path_buf();
        *scratch = Some(dir);
        Ok(path)
    }

    /// Delete the scratch directory, if one was created
    pub(crate) fn release(&self) {
        let dir = self.inner.scratch.lock().take();
        if let Some(dir) = dir {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                tracing::warn!(
                    case = %self.name(),
                    path = %path.display(),
                    "failed to remove scratch directory: {}",
                    e
                );
            }
        }
    }
}

impl fmt::Debug for CaseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseContext")
            .field("name", &self.inner.name)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// A named, isolated unit of test behavior
///
/// Built with a consuming builder:
///
/// ```
/// use std::time::Duration;
/// use verdict::TestCase;
///
/// let case = TestCase::new("connects", |_ctx| Ok(()))
///     .with_before_each(|_ctx| Ok(()))
///     .with_timeout(Duration::from_secs(2))
///     .with_tag("network");
/// assert!(case.has_tag("network"));
/// ```
#[derive(Clone)]
pub struct TestCase {
    name: String,
    body: Body,
    before_each: Option<Hook>,
    after_each: Option<Hook>,
    timeout: Option<Duration>,
    tags: BTreeSet<String>,
    ignored: Option<String>,
    should_error: Option<String>,
}

impl TestCase {
    /// Create a case with a synchronous body
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&CaseContext) -> CaseResult + Send + Sync + 'static,
    {
        Self::with_body(name, Body::Sync(Arc::new(body)))
    }

    /// Create a case with an async body
    ///
    /// The body is driven on a single-threaded Tokio runtime created for the
    /// case; a timeout cancels it at its next `.await`.
    pub fn new_async<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(CaseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        let body: AsyncBody = Arc::new(move |ctx| Box::pin(body(ctx)));
        Self::with_body(name, Body::Async(body))
    }

    fn with_body(name: impl Into<String>, body: Body) -> Self {
        Self {
            name: name.into(),
            body,
            before_each: None,
            after_each: None,
            timeout: None,
            tags: BTreeSet::new(),
            ignored: None,
            should_error: None,
        }
    }

    /// One case per parameter, named `name[index]`
    pub fn parameterized<P, I, F>(name: &str, params: I, body: F) -> Vec<TestCase>
    where
        P: Send + Sync + 'static,
        I: IntoIterator<Item = P>,
        F: Fn(&CaseContext, &P) -> CaseResult + Send + Sync + 'static,
    {
        let body = Arc::new(body);
        params
            .into_iter()
            .enumerate()
            .map(|(index, param)| {
                let body = Arc::clone(&body);
                TestCase::new(format!("{}[{}]", name, index), move |ctx| body(ctx, &param))
            })
            .collect()
    }

    pub fn with_before_each<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CaseContext) -> CaseResult + Send + Sync + 'static,
    {
        self.before_each = Some(Arc::new(hook));
        self
    }

    pub fn with_after_each<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CaseContext) -> CaseResult + Send + Sync + 'static,
    {
        self.after_each = Some(Arc::new(hook));
        self
    }

    /// Share an already boxed hook, e.g. one fixture used by many cases
    pub fn with_before_each_hook(mut self, hook: Hook) -> Self {
        self.before_each = Some(hook);
        self
    }

    pub fn with_after_each_hook(mut self, hook: Hook) -> Self {
        self.after_each = Some(hook);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Never run this case; report it as skipped with `reason`
    pub fn ignore(mut self, reason: impl Into<String>) -> Self {
        self.ignored = Some(reason.into());
        self
    }

    /// The case passes only if the body errors with this kind
    ///
    /// Kinds are the labels of [`CaseError::Uncaught`] (`io`, `spawn`, ...),
    /// or `panic` for a panicking body.
    pub fn should_error(mut self, kind: impl Into<String>) -> Self {
        self.should_error = Some(kind.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn before_each(&self) -> Option<&Hook> {
        self.before_each.as_ref()
    }

    pub fn after_each(&self) -> Option<&Hook> {
        self.after_each.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn ignored(&self) -> Option<&str> {
        self.ignored.as_deref()
    }

    pub fn expected_error(&self) -> Option<&str> {
        self.should_error.as_deref()
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("async", &matches!(self.body, Body::Async(_)))
            .field("before_each", &self.before_each.is_some())
            .field("after_each", &self.after_each.is_some())
            .field("timeout", &self.timeout)
            .field("tags", &self.tags)
            .field("ignored", &self.ignored)
            .field("should_error", &self.should_error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_settings() {
        let case = TestCase::new("case", |_| Ok(()))
            .with_tag("fast")
            .with_tags(["db", "fast"])
            .with_timeout(Duration::from_millis(250))
            .should_error("io");

        assert_eq!(case.name(), "case");
        assert_eq!(case.tags().len(), 2);
        assert!(case.has_tag("db"));
        assert_eq!(case.timeout(), Some(Duration::from_millis(250)));
        assert_eq!(case.expected_error(), Some("io"));
        assert!(case.before_each().is_none());
        assert!(case.ignored().is_none());
    }

    #[test]
    fn test_parameterized_names() {
        let cases = TestCase::parameterized("square", vec![1, 2, 3], |_, n| {
            crate::assert::expect_true(n * n > 0, "square is positive")
        });
        let names: Vec<_> = cases.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["square[0]", "square[1]", "square[2]"]);
    }

    #[test]
    fn test_context_checkpoint() {
        let ctx = CaseContext::new("suite::case");
        assert!(ctx.checkpoint().is_ok());

        let clone = ctx.clone();
        ctx.cancel();
        assert!(clone.is_cancelled());
        assert_eq!(clone.checkpoint(), Err(CaseError::Cancelled));
    }

    #[test]
    fn test_context_scratch_released() {
        let ctx = CaseContext::new("suite::case");
        let dir = ctx.temp_dir().unwrap();
        assert!(dir.exists());
        assert_eq!(ctx.temp_dir().unwrap(), dir);

        ctx.release();
        assert!(!dir.exists());
    }

    #[test]
    fn test_io_error_conversion() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "missing fixture");
        let err: CaseError = inner.into();
        match err {
            CaseError::Uncaught { kind, message, .. } => {
                assert_eq!(kind, "io");
                assert_eq!(message, "missing fixture");
            }
            other => panic!("expected uncaught error, got {:?}", other),
        }
    }
}
