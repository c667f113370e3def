//! Integration tests for the runner
//!
//! Drives complete suite trees through the public API and checks the
//! resulting reports.

use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use verdict::{
    check, check_eq, exit_code, summarize, CaseError, ErrorKind, Filter, OutcomeKind, Registry,
    RunConfig, Runner, TestCase, TestSuite,
};

fn pass(name: &str) -> TestCase {
    TestCase::new(name, |_| Ok(()))
}

fn fail(name: &str) -> TestCase {
    TestCase::new(name, |_| {
        check_eq!(1, 2);
        Ok(())
    })
}

fn suite_of(name: &str, cases: Vec<TestCase>) -> TestSuite {
    let mut suite = TestSuite::new(name);
    suite.add_cases(cases).unwrap();
    suite
}

fn registry_of(suites: Vec<TestSuite>) -> Registry {
    let mut registry = Registry::new();
    for suite in suites {
        registry.register(suite).unwrap();
    }
    registry
}

fn keys(registry: &Registry) -> BTreeSet<String> {
    registry
        .root()
        .flatten()
        .into_iter()
        .map(|p| p.qualified_name)
        .collect()
}

// ============================================================================
// Report shape
// ============================================================================

#[test]
fn test_report_has_one_entry_per_case() {
    let registry = registry_of(vec![
        suite_of("alpha", vec![pass("one"), fail("two")]),
        suite_of("beta", vec![pass("three")]),
    ]);

    let report = Runner::default().run(registry.root());

    let reported: BTreeSet<String> = report.names().map(String::from).collect();
    assert_eq!(reported, keys(&registry));
    assert_eq!(
        report.names().collect::<Vec<_>>(),
        vec!["alpha::one", "alpha::two", "beta::three"]
    );
}

#[test]
fn test_rerun_is_idempotent() {
    let registry = registry_of(vec![suite_of(
        "mixed",
        vec![pass("ok"), fail("bad"), pass("skip").ignore("not today")],
    )]);
    let runner = Runner::default();

    let kinds = |report: &verdict::Report| -> Vec<(String, OutcomeKind)> {
        report
            .iter()
            .map(|r| (r.name.clone(), r.outcome.kind()))
            .collect()
    };

    let first = runner.run(registry.root());
    let second = runner.run(registry.root());
    assert_eq!(kinds(&first), kinds(&second));
}

#[test]
fn test_empty_registry_gives_empty_report() {
    let report = Runner::default().run(Registry::new().root());
    assert!(report.is_empty());
    assert_eq!(exit_code(&report), 0);
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_assertion_versus_error() {
    let registry = registry_of(vec![suite_of(
        "classify",
        vec![
            fail("asserts"),
            TestCase::new("raises", |_| Err(CaseError::uncaught("io", "disk gone"))),
            TestCase::new("panics", |_| panic!("boom")),
        ],
    )]);

    let report = Runner::default().run(registry.root());

    assert!(report.outcome("classify::asserts").unwrap().is_failed());

    let raised = report.outcome("classify::raises").unwrap();
    assert!(raised.is_errored());
    assert_eq!(raised.message(), Some("disk gone"));

    let panicked = report.outcome("classify::panics").unwrap();
    assert!(panicked.is_errored());
    assert_eq!(panicked.message(), Some("boom"));
}

#[test]
fn test_timeout_reports_timeout_error() {
    let registry = registry_of(vec![suite_of(
        "slow",
        vec![TestCase::new("sleeps", |ctx| {
            loop {
                ctx.checkpoint()?;
                std::thread::sleep(Duration::from_millis(5));
            }
        })
        .with_timeout(Duration::from_millis(50))],
    )]);

    let report = Runner::default().run(registry.root());
    let outcome = report.outcome("slow::sleeps").unwrap();

    assert!(outcome.is_timeout());
    match outcome {
        verdict::Outcome::Errored { kind, .. } => assert_eq!(*kind, ErrorKind::TimeoutExceeded),
        other => panic!("expected errored outcome, got {:?}", other),
    }
}

// ============================================================================
// Hooks
// ============================================================================

#[rstest]
#[case::passing_body(false)]
#[case::panicking_body(true)]
fn test_after_each_runs_exactly_once(#[case] body_panics: bool) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let case = TestCase::new("guarded", move |_| {
        if body_panics {
            panic!("body exploded");
        }
        Ok(())
    })
    .with_after_each(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let registry = registry_of(vec![suite_of("hooks", vec![case])]);
    let report = Runner::default().run(registry.root());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        report.outcome("hooks::guarded").unwrap().is_errored(),
        body_panics
    );
}

#[test]
fn test_shared_fixture_hooks() {
    let setups = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&setups);
    let hook: verdict::case::Hook = Arc::new(move |ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        let dir = ctx.temp_dir()?;
        std::fs::write(dir.join("fixture.txt"), "seed")?;
        Ok(())
    });

    let cases = TestCase::parameterized("reads", vec!["a", "b", "c"], |ctx, _param| {
        let dir = ctx.temp_dir()?;
        let contents = std::fs::read_to_string(dir.join("fixture.txt"))?;
        check!(contents == "seed");
        Ok(())
    })
    .into_iter()
    .map(|case| case.with_before_each_hook(Arc::clone(&hook)))
    .collect();

    let registry = registry_of(vec![suite_of("fixtures", cases)]);
    let report = Runner::default().run(registry.root());

    assert_eq!(setups.load(Ordering::SeqCst), 3);
    assert_eq!(summarize(&report).passed, 3);
    assert!(report.contains("fixtures::reads[2]"));
}

// ============================================================================
// Fail-fast
// ============================================================================

#[test]
fn test_fail_fast_skips_remaining_cases() {
    let ran = Arc::new(AtomicUsize::new(0));
    let (second, third) = (Arc::clone(&ran), Arc::clone(&ran));

    let registry = registry_of(vec![suite_of(
        "ordered",
        vec![
            fail("first"),
            TestCase::new("second", move |_| {
                second.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            TestCase::new("third", move |_| {
                third.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        ],
    )]);

    let config = RunConfig::default().with_fail_fast(true);
    let report = Runner::new(config).run(registry.root());

    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert!(report.outcome("ordered::first").unwrap().is_failed());
    for name in ["ordered::second", "ordered::third"] {
        let outcome = report.outcome(name).unwrap();
        assert!(outcome.is_skipped());
        assert_eq!(outcome.message(), Some(verdict::runner::FAIL_FAST_REASON));
    }
}

#[test]
fn test_without_fail_fast_everything_runs() {
    let registry = registry_of(vec![suite_of(
        "ordered",
        vec![fail("first"), pass("second"), pass("third")],
    )]);

    let report = Runner::default().run(registry.root());
    let summary = summarize(&report);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.passed, 2);
    assert_eq!(summary.skipped, 0);
}

// ============================================================================
// Exit codes
// ============================================================================

#[rstest]
#[case::all_pass(vec![pass("a"), pass("b"), pass("c")], 0)]
#[case::one_failure(vec![pass("a"), pass("b"), fail("c")], 1)]
#[case::skips_only(vec![pass("a").ignore("later")], 0)]
#[case::error(vec![TestCase::new("a", |_| panic!("x"))], 1)]
fn test_exit_code(#[case] cases: Vec<TestCase>, #[case] expected: i32) {
    let registry = registry_of(vec![suite_of("exit", cases)]);
    let report = Runner::default().run(registry.root());
    assert_eq!(exit_code(&report), expected);
}

// ============================================================================
// Parallel execution
// ============================================================================

#[rstest]
#[case(2)]
#[case(4)]
fn test_parallel_matches_sequential(#[case] jobs: usize) {
    let registry = registry_of(
        (0..4)
            .map(|i| {
                suite_of(
                    &format!("suite{}", i),
                    vec![pass("one"), fail("two"), pass("three").with_tag("slow")],
                )
            })
            .collect(),
    );

    let sequential = Runner::default().run(registry.root());
    let parallel = Runner::new(RunConfig::default().with_parallelism(jobs)).run(registry.root());

    // Shards are merged in discovery order
    assert_eq!(
        parallel.names().collect::<Vec<_>>(),
        sequential.names().collect::<Vec<_>>()
    );
    for record in sequential.iter() {
        assert_eq!(
            parallel.outcome(&record.name).map(|o| o.kind()),
            Some(record.outcome.kind())
        );
    }
}

#[test]
fn test_parallel_suites_overlap() {
    use std::sync::Barrier;

    // Both suites must be in flight at once to get past the barrier
    let barrier = Arc::new(Barrier::new(2));
    let suites = ["left", "right"]
        .iter()
        .map(|name| {
            let barrier = Arc::clone(&barrier);
            suite_of(
                name,
                vec![TestCase::new("meet", move |_| {
                    barrier.wait();
                    Ok(())
                })
                .with_timeout(Duration::from_secs(10))],
            )
        })
        .collect();

    let registry = registry_of(suites);
    let report = Runner::new(RunConfig::default().with_parallelism(2)).run(registry.root());
    assert_eq!(summarize(&report).passed, 2);
}

// ============================================================================
// Selection and filtering
// ============================================================================

#[test]
fn test_filter_then_run() {
    let registry = registry_of(vec![
        suite_of(
            "net",
            vec![pass("dns").with_tag("slow"), pass("tcp"), fail("udp")],
        ),
        suite_of("disk", vec![pass("read").with_tag("slow")]),
    ]);

    let filtered = registry.filter(&Filter::new().with_tag("slow"));
    let report = Runner::default().run(&filtered);
    assert_eq!(
        report.names().collect::<Vec<_>>(),
        vec!["net::dns", "disk::read"]
    );

    let selected = registry.select("net").unwrap();
    let narrowed = Filter::new().without_tag("slow").apply(&selected);
    let report = Runner::default().run(&narrowed);
    assert_eq!(report.names().collect::<Vec<_>>(), vec!["net::tcp", "net::udp"]);
    assert_eq!(exit_code(&report), 1);
}

#[test]
fn test_unknown_selector_is_configuration_error() {
    let registry = registry_of(vec![suite_of("net", vec![pass("tcp")])]);
    let err = registry.select("nope").unwrap_err();
    assert!(err.is_configuration());
}
