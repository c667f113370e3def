//! Command implementations

pub mod list;
pub mod run;

use anyhow::Result;
use std::path::{Path, PathBuf};
use verdict::{Filter, Registry, TestSuite};

/// Discover suites under `dir` and narrow them to `selector` and `filter`
pub(crate) fn select_cases(
    dir: &Path,
    selector: Option<&str>,
    filter: &Filter,
) -> Result<TestSuite> {
    let registry = crate::scripts::discover(dir)?;
    select_from(&registry, selector, filter)
}

fn select_from(registry: &Registry, selector: Option<&str>, filter: &Filter) -> Result<TestSuite> {
    let selected = registry.select(selector.unwrap_or(""))?;
    Ok(filter.apply(&selected))
}

/// Build a filter from repeated `--tag` / `--exclude-tag` flags and a pattern
pub(crate) fn build_filter(
    tags: &[String],
    exclude_tags: &[String],
    pattern: Option<&str>,
) -> Filter {
    let mut filter = Filter::new();
    for tag in tags {
        filter = filter.with_tag(tag.as_str());
    }
    for tag in exclude_tags {
        filter = filter.without_tag(tag.as_str());
    }
    if let Some(pattern) = pattern {
        filter = filter.with_pattern(pattern);
    }
    filter
}

/// Suite directory: explicit flag, else the configured discovery root
pub(crate) fn suite_dir(dir: Option<PathBuf>, settings: &verdict_config::Config) -> PathBuf {
    dir.unwrap_or_else(|| settings.discovery_root())
}
