//! List command - show the cases a run would execute

use super::{build_filter, select_cases, suite_dir};
use anyhow::Result;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use verdict::TestSuite;

/// Arguments for the list command
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    pub selector: Option<String>,
    pub tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    /// Substring of the qualified case name
    pub filter: Option<String>,
    pub dir: Option<PathBuf>,
    /// Output in JSON format
    pub json: bool,
}

/// One listed case
#[derive(Debug, Serialize, PartialEq)]
struct Listing<'a> {
    name: String,
    tags: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ignored: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
}

fn listings(suite: &TestSuite) -> Vec<Listing<'_>> {
    suite
        .flatten()
        .into_iter()
        .map(|planned| Listing {
            name: planned.qualified_name,
            tags: planned.case.tags().iter().map(String::as_str).collect(),
            ignored: planned.case.ignored(),
            timeout_ms: planned.case.timeout().map(|t| t.as_millis() as u64),
        })
        .collect()
}

/// Print the selected cases in discovery order
pub fn run(args: ListArgs, settings: &verdict_config::Config) -> Result<()> {
    let dir = suite_dir(args.dir, settings);
    let filter = build_filter(&args.tags, &args.exclude_tags, args.filter.as_deref());
    let suite = select_cases(&dir, args.selector.as_deref(), &filter)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_listing(&suite, args.json, &mut out)?;
    out.flush()?;
    Ok(())
}

fn write_listing<W: Write>(suite: &TestSuite, json: bool, out: &mut W) -> Result<()> {
    let entries = listings(suite);
    if json {
        serde_json::to_writer_pretty(&mut *out, &entries)?;
        writeln!(out)?;
        return Ok(());
    }

    for entry in &entries {
        let mut line = entry.name.clone();
        if !entry.tags.is_empty() {
            line.push_str(&format!(" [{}]", entry.tags.join(", ")));
        }
        if let Some(reason) = entry.ignored {
            line.push_str(&format!(" (ignored: {})", reason));
        }
        writeln!(out, "{}", line)?;
    }
    if entries.is_empty() {
        eprintln!("No cases found.");
    }
    Ok(())
}
