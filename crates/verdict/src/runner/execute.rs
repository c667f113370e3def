//! Execution of a single case: hooks, body, timeout and classification

use super::RunConfig;
use crate::assert::AssertionFailure;
use crate::case::{AsyncBody, Body, CaseContext, CaseError, CaseResult, Hook};
use crate::outcome::{ErrorKind, Outcome};
use crate::report::CaseRecord;
use crate::suite::PlannedCase;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Why a guarded call did not return `Ok(())`
#[derive(Debug)]
enum Interruption {
    Case(CaseError),
    Panic(String),
}

/// Run one case with its hooks and turn whatever happens into a record
pub(super) fn run_case(planned: &PlannedCase<'_>, config: &RunConfig) -> CaseRecord {
    let name = planned.qualified_name.as_str();
    let case = planned.case;

    if let Some(reason) = case.ignored() {
        tracing::debug!(case = %name, "ignored");
        return CaseRecord::new(name, Outcome::skipped(reason), Duration::ZERO);
    }

    tracing::debug!(case = %name, "running");
    let start = Instant::now();
    let ctx = CaseContext::new(name);

    let setup = match case.before_each() {
        Some(hook) => guard(|| hook(&ctx)).err(),
        None => None,
    };

    let outcome = match setup {
        Some(interruption) => hook_outcome("before_each", interruption),
        None => {
            let timeout = case.timeout().or(config.timeout);
            let outcome = run_body(case.body(), &ctx, timeout, config.cancel_grace);
            match case.expected_error() {
                Some(expected) => expect_error(expected, outcome),
                None => outcome,
            }
        }
    };

    let outcome = match case.after_each() {
        Some(hook) => run_after_each(hook, &ctx, outcome),
        None => outcome,
    };

    ctx.release();

    let duration = start.elapsed();
    tracing::debug!(case = %name, outcome = outcome.label(), ?duration, "finished");
    CaseRecord::new(name, outcome, duration)
}

/// Run `after_each`; its failure only replaces a passing outcome
fn run_after_each(hook: &Hook, ctx: &CaseContext, outcome: Outcome) -> Outcome {
    match guard(|| hook(ctx)) {
        Ok(()) => outcome,
        Err(interruption) => {
            tracing::warn!(
                case = %ctx.name(),
                "after_each failed: {}",
                describe(&interruption)
            );
            if outcome.is_passed() {
                hook_outcome("after_each", interruption)
            } else {
                outcome
            }
        }
    }
}

fn run_body(body: &Body, ctx: &CaseContext, timeout: Option<Duration>, grace: Duration) -> Outcome {
    match body {
        Body::Sync(body) => match timeout {
            None => settle(guard(|| body(ctx)), None),
            Some(limit) => run_sync_with_timeout(Arc::clone(body), ctx, limit, grace),
        },
        Body::Async(body) => run_async(body, ctx, timeout),
    }
}

/// Run a synchronous body on its own thread and wait at most `limit`
///
/// On timeout the context is cancelled and the body gets `grace` to reach a
/// checkpoint. A body that never checks is left running on its detached
/// thread; the case is recorded as timed out either way.
fn run_sync_with_timeout(
    body: Hook,
    ctx: &CaseContext,
    limit: Duration,
    grace: Duration,
) -> Outcome {
    let (tx, rx) = mpsc::channel();
    let worker_ctx = ctx.clone();

    let spawned = thread::Builder::new()
        .name(format!("verdict-case-{}", ctx.name()))
        .spawn(move || {
            let result = guard(|| body(&worker_ctx));
            // The receiver is gone only if the runner stopped waiting
            let _ = tx.send(result);
        });

    let handle = match spawned {
        Ok(handle) => handle,
        Err(e) => {
            return Outcome::errored(
                ErrorKind::Uncaught("spawn".to_string()),
                format!("failed to spawn case thread: {}", e),
            )
        }
    };

    match rx.recv_timeout(limit) {
        Ok(result) => {
            let _ = handle.join();
            settle(result, Some(limit))
        }
        Err(RecvTimeoutError::Timeout) => {
            ctx.cancel();
            match rx.recv_timeout(grace) {
                Ok(_) => {
                    let _ = handle.join();
                }
                Err(_) => tracing::warn!(
                    case = %ctx.name(),
                    "body did not reach a checkpoint within {:.2?}; detaching it",
                    grace
                ),
            }
            Outcome::timed_out(limit)
        }
        Err(RecvTimeoutError::Disconnected) => {
            let _ = handle.join();
            Outcome::errored(
                ErrorKind::Panic,
                "case thread exited without reporting a result",
            )
        }
    }
}

/// Drive an async body on a fresh current-thread runtime
fn run_async(body: &AsyncBody, ctx: &CaseContext, timeout: Option<Duration>) -> Outcome {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            return Outcome::errored(
                ErrorKind::Uncaught("runtime".to_string()),
                format!("failed to start async runtime: {}", e),
            )
        }
    };

    let result = guard(|| {
        let future = body(ctx.clone());
        runtime.block_on(async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, future)
                    .await
                    .unwrap_or(Err(CaseError::Cancelled)),
                None => future.await,
            }
        })
    });

    if matches!(result, Err(Interruption::Case(CaseError::Cancelled))) {
        ctx.cancel();
    }
    settle(result, timeout)
}

/// Call `f`, converting panics into interruptions
fn guard<F>(f: F) -> Result<(), Interruption>
where
    F: FnOnce() -> CaseResult,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(Interruption::Case(error)),
        Err(payload) => Err(match payload.downcast::<AssertionFailure>() {
            Ok(failure) => Interruption::Case(CaseError::Assertion(*failure)),
            Err(payload) => Interruption::Panic(panic_message(payload.as_ref())),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

/// Classify the result of a body
fn settle(result: Result<(), Interruption>, limit: Option<Duration>) -> Outcome {
    match result {
        Ok(()) => Outcome::Passed,
        Err(Interruption::Case(CaseError::Assertion(failure))) => {
            Outcome::failed(failure.expected, failure.actual, failure.message)
        }
        Err(Interruption::Case(CaseError::Skip(reason))) => Outcome::skipped(reason),
        Err(Interruption::Case(CaseError::Uncaught {
            kind,
            message,
            causes,
        })) => Outcome::errored(ErrorKind::Uncaught(kind), message)
            .with_stack_summary(stack_summary(&causes)),
        Err(Interruption::Case(CaseError::Cancelled)) => match limit {
            Some(limit) => Outcome::timed_out(limit),
            None => Outcome::errored(ErrorKind::TimeoutExceeded, "cancelled"),
        },
        Err(Interruption::Panic(message)) => Outcome::errored(ErrorKind::Panic, message),
    }
}

/// Classify a hook failure; skips stay skips, everything else errors
fn hook_outcome(hook: &str, interruption: Interruption) -> Outcome {
    let message = format!("{} failed: {}", hook, describe(&interruption));
    match interruption {
        Interruption::Case(CaseError::Skip(reason)) => Outcome::skipped(reason),
        Interruption::Case(CaseError::Assertion(_)) => {
            Outcome::errored(ErrorKind::Uncaught("assertion".to_string()), message)
        }
        Interruption::Case(CaseError::Uncaught { kind, causes, .. }) => {
            Outcome::errored(ErrorKind::Uncaught(kind), message)
                .with_stack_summary(stack_summary(&causes))
        }
        Interruption::Case(CaseError::Cancelled) => {
            Outcome::errored(ErrorKind::TimeoutExceeded, message)
        }
        Interruption::Panic(_) => Outcome::errored(ErrorKind::Panic, message),
    }
}

/// Apply a `should_error` expectation to the body outcome
fn expect_error(expected: &str, outcome: Outcome) -> Outcome {
    match &outcome {
        Outcome::Errored { kind, .. } if kind.name() == expected => Outcome::Passed,
        Outcome::Errored { kind, message, .. } => Outcome::failed(
            Some(expected.to_string()),
            Some(kind.name().to_string()),
            format!(
                "expected error of kind '{}', got '{}': {}",
                expected,
                kind.name(),
                message
            ),
        ),
        Outcome::Passed => Outcome::failed(
            Some(expected.to_string()),
            Some("no error".to_string()),
            format!("expected error of kind '{}', but the body completed", expected),
        ),
        Outcome::Failed { .. } | Outcome::Skipped { .. } => outcome,
    }
}

fn describe(interruption: &Interruption) -> String {
    match interruption {
        Interruption::Case(error) => error.to_string(),
        Interruption::Panic(message) => format!("panicked: {}", message),
    }
}

fn stack_summary(causes: &[String]) -> Option<String> {
    if causes.is_empty() {
        return None;
    }
    Some(
        causes
            .iter()
            .map(|cause| format!("caused by: {}", cause))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}
