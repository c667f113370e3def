//! Suite discovery - build a registry from a tree of suite files

use super::SuiteFile;
use anyhow::{bail, Context, Result};
use std::path::Path;
use verdict::{Registry, SuiteItem, TestSuite};
use walkdir::WalkDir;

/// File name suffix of script suites
pub const SUITE_EXTENSION: &str = ".suite.toml";

/// Discover every suite file under `root`
///
/// Files are visited in file-name order. `dir/sub/name.suite.toml` becomes
/// suite `name` nested in suites `dir` and `sub`; a directory and a file with
/// the same name contribute to the same suite. Any unreadable or invalid
/// file aborts discovery.
pub fn discover(root: &Path) -> Result<Registry> {
    if !root.is_dir() {
        bail!("suite directory {} does not exist", root.display());
    }

    let mut tree = TestSuite::new("discovered");
    let mut files = 0usize;

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
    {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(stem) = suite_stem(path) else {
            continue;
        };

        let relative = path.strip_prefix(root).unwrap_or(path);
        let mut parent = &mut tree;
        if let Some(dirs) = relative.parent() {
            for dir in dirs.iter() {
                let dir = dir.to_string_lossy();
                parent = parent
                    .suite_entry(&dir)
                    .with_context(|| format!("cannot nest suites for {}", path.display()))?;
            }
        }

        let cases = SuiteFile::load(path)?
            .into_cases()
            .with_context(|| format!("invalid suite file {}", path.display()))?;
        parent
            .suite_entry(stem)
            .and_then(|suite| suite.add_cases(cases))
            .with_context(|| format!("invalid suite file {}", path.display()))?;

        tracing::debug!(file = %path.display(), "loaded suite file");
        files += 1;
    }

    let mut registry = Registry::new();
    for item in tree.into_items() {
        if let SuiteItem::Suite(suite) = item {
            registry.register(suite)?;
        }
    }

    tracing::info!(
        root = %root.display(),
        files,
        cases = registry.len(),
        "discovery finished"
    );
    Ok(registry)
}

/// Suite name of a suite file, `None` for other files
fn suite_stem(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(SUITE_EXTENSION)
        .filter(|stem| !stem.is_empty())
}
