//! Test runner - execute a suite tree and collect a report
//!
//! Cases run depth-first in discovery order. Within a suite they always run
//! one after another; with `parallelism > 1` the top-level entries of the tree
//! become shards that run concurrently on a dedicated rayon pool, each shard
//! filling its own report which is merged back in discovery order.

mod execute;

use crate::outcome::Outcome;
use crate::report::{CaseRecord, Report};
use crate::suite::{PlannedCase, SuiteItem, TestSuite};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Reason recorded for cases not run because of fail-fast
pub const FAIL_FAST_REASON: &str = "fail-fast";

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Timeout for cases that do not set their own (`None` = unlimited)
    pub timeout: Option<Duration>,
    /// Stop after the first failed or errored case
    pub fail_fast: bool,
    /// Number of worker threads; 1 runs everything sequentially
    pub parallelism: usize,
    /// Shuffle cases within each suite using this seed
    pub shuffle_seed: Option<u64>,
    /// How long to wait for a timed-out body to reach a checkpoint
    pub cancel_grace: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            fail_fast: false,
            parallelism: 1,
            shuffle_seed: None,
            cancel_grace: Duration::from_secs(1),
        }
    }
}

impl RunConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Set the worker count; values below 1 are treated as 1
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.parallelism > 1
    }
}

/// Executes suite trees
///
/// A runner holds no state between runs; the same runner can run any number
/// of suites, also from several threads at once.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    config: RunConfig,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every case of `suite` and return the report
    pub fn run(&self, suite: &TestSuite) -> Report {
        let start = Instant::now();
        let mut report = Report::begin();

        let discovery = suite;
        let shuffled;
        let suite = match self.config.shuffle_seed {
            Some(seed) => {
                shuffled = shuffle(suite, seed);
                &shuffled
            }
            None => suite,
        };

        tracing::info!(
            cases = suite.len(),
            parallelism = self.config.parallelism,
            fail_fast = self.config.fail_fast,
            "starting run"
        );

        let halted = AtomicBool::new(false);
        let shards = if self.config.is_parallel() {
            self.run_parallel(suite, &halted)
        } else {
            vec![self.run_shard(&suite.flatten(), &halted)]
        };

        for shard in shards {
            if let Err(e) = report.merge(shard) {
                tracing::error!("dropping duplicate result: {}", e);
            }
        }

        // Shuffling changes execution order only
        if self.config.shuffle_seed.is_some() {
            let order = discovery.flatten();
            report.reorder(order.iter().map(|p| p.qualified_name.as_str()));
        }

        report.finish(start.elapsed());
        tracing::info!(
            cases = report.len(),
            elapsed = ?report.total_duration,
            "run finished"
        );
        report
    }

    /// Run shards concurrently on a scoped pool sized by `parallelism`
    fn run_parallel(&self, suite: &TestSuite, halted: &AtomicBool) -> Vec<Report> {
        let shards = shards(suite);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.parallelism)
            .thread_name(|index| format!("verdict-worker-{}", index))
            .build();

        match pool {
            Ok(pool) => pool.install(|| {
                shards
                    .par_iter()
                    .map(|shard| self.run_shard(shard, halted))
                    .collect()
            }),
            Err(e) => {
                tracing::warn!("failed to create thread pool ({e}), running sequentially");
                shards
                    .iter()
                    .map(|shard| self.run_shard(shard, halted))
                    .collect()
            }
        }
    }

    /// Run cases one after another into a report shard
    fn run_shard(&self, cases: &[PlannedCase<'_>], halted: &AtomicBool) -> Report {
        let mut shard = Report::begin();

        for planned in cases {
            let record = if self.config.fail_fast && halted.load(Ordering::SeqCst) {
                CaseRecord::new(
                    planned.qualified_name.clone(),
                    Outcome::skipped(FAIL_FAST_REASON),
                    Duration::ZERO,
                )
            } else {
                let record = execute::run_case(planned, &self.config);
                if self.config.fail_fast && record.outcome.is_failure() {
                    tracing::debug!(case = %record.name, "fail-fast triggered");
                    halted.store(true, Ordering::SeqCst);
                }
                record
            };

            if let Err(e) = shard.insert(record) {
                tracing::error!("dropping duplicate result: {}", e);
            }
        }

        shard
    }
}

/// Split the tree into independently runnable shards
///
/// Every nested suite of the top level is a shard; consecutive top-level
/// cases are grouped into one shard so that merging shards in order keeps
/// discovery order.
fn shards(suite: &TestSuite) -> Vec<Vec<PlannedCase<'_>>> {
    let prefix = suite.name();
    let mut shards = Vec::new();
    let mut loose = Vec::new();

    for item in suite.items() {
        match item {
            SuiteItem::Case(case) => loose.push(PlannedCase {
                qualified_name: crate::suite::join(prefix, case.name()),
                case,
            }),
            SuiteItem::Suite(nested) => {
                if !loose.is_empty() {
                    shards.push(std::mem::take(&mut loose));
                }
                shards.push(nested.flatten_under(prefix));
            }
        }
    }
    if !loose.is_empty() {
        shards.push(loose);
    }
    shards
}

/// Copy of `suite` with the entries of every suite shuffled by `seed`
fn shuffle(suite: &TestSuite, seed: u64) -> TestSuite {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut shuffled = suite.clone();
    shuffled.reorder_with(&mut |items: &mut [SuiteItem]| items.shuffle(&mut rng));
    shuffled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::TestCase;
    use pretty_assertions::assert_eq;

    fn pass(name: &str) -> TestCase {
        TestCase::new(name, |_| Ok(()))
    }

    fn tree() -> TestSuite {
        let mut a = TestSuite::new("a");
        a.add_cases(vec![pass("one"), pass("two")]).unwrap();
        let mut b = TestSuite::new("b");
        b.add_case(pass("three")).unwrap();

        let mut root = TestSuite::new("root");
        root.add_case(pass("first")).unwrap();
        root.add_suite(a).unwrap();
        root.add_case(pass("middle")).unwrap();
        root.add_suite(b).unwrap();
        root
    }

    #[test]
    fn test_shards_keep_discovery_order() {
        let suite = tree();
        let shards = shards(&suite);
        let names: Vec<Vec<String>> = shards
            .iter()
            .map(|s| s.iter().map(|p| p.qualified_name.clone()).collect())
            .collect();

        assert_eq!(
            names,
            vec![
                vec!["root::first".to_string()],
                vec!["root::a::one".to_string(), "root::a::two".to_string()],
                vec!["root::middle".to_string()],
                vec!["root::b::three".to_string()],
            ]
        );

        let flat: Vec<String> = names.into_iter().flatten().collect();
        let expected: Vec<String> = suite
            .flatten()
            .into_iter()
            .map(|p| p.qualified_name)
            .collect();
        assert_eq!(flat, expected);
    }

    #[test]
    fn test_shuffle_is_reproducible() {
        let mut suite = TestSuite::new("s");
        suite
            .add_cases((0..20).map(|i| pass(&format!("c{}", i))))
            .unwrap();

        let order = |seed| -> Vec<String> {
            shuffle(&suite, seed)
                .flatten()
                .into_iter()
                .map(|p| p.qualified_name)
                .collect()
        };

        assert_eq!(order(7), order(7));
        let mut sorted = order(7);
        sorted.sort();
        let mut original: Vec<String> = suite
            .flatten()
            .into_iter()
            .map(|p| p.qualified_name)
            .collect();
        original.sort();
        assert_eq!(sorted, original);
    }

    #[test]
    fn test_shuffled_run_reports_in_discovery_order() {
        use std::sync::{Arc, Mutex};

        let executed = Arc::new(Mutex::new(Vec::new()));
        let mut root = TestSuite::new("root");
        for name in ["a", "b", "c", "d", "e", "f", "g", "h"] {
            let log = Arc::clone(&executed);
            let case = TestCase::new("x", move |ctx| {
                log.lock().unwrap().push(ctx.name().to_string());
                Ok(())
            });
            root.add_suite(TestSuite::new(name).with_case(case).unwrap())
                .unwrap();
        }
        let discovery: Vec<String> = root
            .flatten()
            .into_iter()
            .map(|p| p.qualified_name)
            .collect();

        let config = RunConfig::default().with_shuffle_seed(3);
        let report = Runner::new(config.clone()).run(&root);
        let names: Vec<String> = report.names().map(str::to_string).collect();
        assert_eq!(names, discovery);
        assert_eq!(report.get("root::c::x").map(|r| r.name.as_str()), Some("root::c::x"));

        // the same seed yields the same execution order every time
        let first = executed.lock().unwrap().clone();
        executed.lock().unwrap().clear();
        Runner::new(config).run(&root);
        assert_eq!(*executed.lock().unwrap(), first);
    }

    #[test]
    fn test_config_builder() {
        let config = RunConfig::default()
            .with_parallelism(0)
            .with_fail_fast(true)
            .with_timeout(Duration::from_secs(3));
        assert_eq!(config.parallelism, 1);
        assert!(!config.is_parallel());
        assert!(config.fail_fast);
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_run_records_every_case() {
        let report = Runner::default().run(&tree());
        assert_eq!(report.len(), 5);
        assert!(report.iter().all(|r| r.outcome.is_passed()));
    }
}
