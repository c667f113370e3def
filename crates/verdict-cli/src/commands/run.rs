//! Run command - discover, select and execute script suites

use super::{build_filter, select_cases, suite_dir};
use crate::scripts::timeout_from_secs;
use anyhow::{bail, Context, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use verdict::{exit_code, Format, Reporter, RunConfig, Runner};

/// Arguments for the run command
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    /// Suite path to run (`*` or none for everything)
    pub selector: Option<String>,
    /// Only cases carrying one of these tags
    pub tags: Vec<String>,
    /// Skip cases carrying any of these tags
    pub exclude_tags: Vec<String>,
    /// Substring of the qualified case name
    pub filter: Option<String>,
    /// Default per-case timeout in seconds
    pub timeout: Option<f64>,
    pub fail_fast: bool,
    /// Report format ("text" or "json")
    pub format: Option<String>,
    /// Suite directory (defaults to the configured discovery root)
    pub dir: Option<PathBuf>,
    /// Worker threads for parallel suites
    pub jobs: Option<usize>,
    /// Seed for shuffling case order
    pub shuffle: Option<u64>,
    /// List passing cases too
    pub verbose: bool,
    pub no_color: bool,
}

/// Everything resolved from flags and configuration before running
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunPlan {
    pub run_config: RunConfig,
    pub format: Format,
    pub dir: PathBuf,
    pub color: bool,
}

impl RunPlan {
    /// Merge flags over configuration; flags win
    pub(crate) fn resolve(args: &RunArgs, settings: &verdict_config::Config) -> Result<Self> {
        let format: Format = args
            .format
            .as_deref()
            .unwrap_or_else(|| settings.format())
            .parse()?;

        let timeout = match args.timeout {
            Some(secs) => Some(timeout_from_secs(secs).context("--timeout")?),
            None => settings.timeout(),
        };

        let mut run_config = RunConfig::default()
            .with_fail_fast(args.fail_fast || settings.fail_fast())
            .with_parallelism(args.jobs.unwrap_or_else(|| settings.parallelism()));
        if let Some(timeout) = timeout {
            run_config = run_config.with_timeout(timeout);
        }
        if let Some(seed) = args.shuffle.or_else(|| settings.shuffle_seed()) {
            run_config = run_config.with_shuffle_seed(seed);
        }

        Ok(Self {
            run_config,
            format,
            dir: suite_dir(args.dir.clone(), settings),
            color: !args.no_color && settings.color(),
        })
    }
}

/// Run the selected cases, render the report and return the exit code
pub fn run(args: RunArgs, settings: &verdict_config::Config) -> Result<i32> {
    let plan = RunPlan::resolve(&args, settings)?;
    let filter = build_filter(&args.tags, &args.exclude_tags, args.filter.as_deref());
    let suite = select_cases(&plan.dir, args.selector.as_deref(), &filter)?;

    if suite.is_empty() {
        bail!("no cases match the selection in {}", plan.dir.display());
    }

    tracing::debug!(config = ?plan.run_config, "resolved run configuration");
    let report = Runner::new(plan.run_config).run(&suite);

    let reporter = Reporter::new(plan.format)
        .with_verbose(args.verbose)
        .with_no_color(!plan.color);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    reporter
        .render(&report, &mut out)
        .context("failed to write report")?;
    out.flush()?;

    Ok(exit_code(&report))
}
