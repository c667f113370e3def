//! Test reporter - summaries, exit codes and rendered output

use crate::error::HarnessError;
use crate::outcome::Outcome;
use crate::report::{CaseRecord, Report};
use colored::*;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::time::Duration;

/// Output format of a rendered report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Json,
}

impl FromStr for Format {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            other => Err(HarnessError::Configuration(format!(
                "unknown report format '{}' (expected 'text' or 'json')",
                other
            ))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Text => f.write_str("text"),
            Format::Json => f.write_str("json"),
        }
    }
}

/// Aggregate counts of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
    #[serde(skip)]
    pub duration: Duration,
}

impl Summary {
    /// Whether the run counts as successful
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}

/// Count outcomes by kind
pub fn summarize(report: &Report) -> Summary {
    let mut summary = Summary {
        duration: report.total_duration,
        ..Summary::default()
    };
    for record in report.iter() {
        summary.total += 1;
        match record.outcome {
            Outcome::Passed => summary.passed += 1,
            Outcome::Failed { .. } => summary.failed += 1,
            Outcome::Errored { .. } => summary.errored += 1,
            Outcome::Skipped { .. } => summary.skipped += 1,
        }
    }
    summary
}

/// Process exit status: 0 when nothing failed or errored, 1 otherwise
pub fn exit_code(report: &Report) -> i32 {
    if summarize(report).is_success() {
        0
    } else {
        1
    }
}

/// Machine-readable form of a report
#[derive(Serialize)]
struct JsonReport<'a> {
    summary: Summary,
    exit_code: i32,
    #[serde(flatten)]
    report: &'a Report,
}

/// Renders reports as text or JSON
#[derive(Debug, Clone)]
pub struct Reporter {
    format: Format,
    /// List every case, not only the non-passing ones
    verbose: bool,
    /// Emit ANSI colors in text output
    color: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(Format::Text)
    }
}

impl Reporter {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            verbose: false,
            color: true,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Disable colored output
    pub fn with_no_color(mut self, no_color: bool) -> Self {
        self.color = !no_color;
        self
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Write the report to `out`
    pub fn render<W: Write>(&self, report: &Report, out: &mut W) -> io::Result<()> {
        match self.format {
            Format::Text => self.render_text(report, out),
            Format::Json => render_json(report, out),
        }
    }

    /// Render into a string
    pub fn render_to_string(&self, report: &Report) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.render(report, &mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    fn render_text<W: Write>(&self, report: &Report, out: &mut W) -> io::Result<()> {
        for record in report.iter() {
            if self.verbose || !record.outcome.is_passed() {
                self.write_record(record, out)?;
            }
        }

        let summary = summarize(report);
        if self.verbose || summary.total != summary.passed {
            writeln!(out)?;
        }
        self.write_summary(&summary, out)
    }

    /// One line per case, followed by expected/actual and stack detail
    fn write_record<W: Write>(&self, record: &CaseRecord, out: &mut W) -> io::Result<()> {
        let label = record.outcome.label();
        let label = match &record.outcome {
            Outcome::Passed => self.paint(label, |s| s.green().bold()),
            Outcome::Failed { .. } => self.paint(label, |s| s.red().bold()),
            Outcome::Errored { .. } => self.paint(label, |s| s.red().bold()),
            Outcome::Skipped { .. } => self.paint(label, |s| s.yellow().bold()),
        };

        match record.outcome.message() {
            Some(message) => writeln!(
                out,
                "{} {} ({:.2?}): {}",
                label,
                record.name,
                record.duration,
                first_line(message)
            )?,
            None => writeln!(out, "{} {} ({:.2?})", label, record.name, record.duration)?,
        }

        match &record.outcome {
            Outcome::Failed {
                expected, actual, ..
            } => {
                if let Some(expected) = expected {
                    writeln!(out, "      expected: {}", expected)?;
                }
                if let Some(actual) = actual {
                    writeln!(out, "      actual:   {}", actual)?;
                }
            }
            Outcome::Errored {
                message,
                stack_summary,
                ..
            } => {
                for line in message.lines().skip(1) {
                    writeln!(out, "      {}", self.paint(line, |s| s.dimmed()))?;
                }
                if let Some(stack) = stack_summary {
                    for line in stack.lines() {
                        writeln!(out, "      {}", self.paint(line, |s| s.dimmed()))?;
                    }
                }
            }
            Outcome::Passed | Outcome::Skipped { .. } => {}
        }
        Ok(())
    }

    fn write_summary<W: Write>(&self, summary: &Summary, out: &mut W) -> io::Result<()> {
        let status = if summary.is_success() {
            self.paint("PASSED", |s| s.green().bold())
        } else {
            self.paint("FAILED", |s| s.red().bold())
        };

        writeln!(
            out,
            "Test result: {} | {} total, {} passed, {} failed, {} errored, {} skipped",
            status,
            summary.total,
            summary.passed,
            summary.failed,
            summary.errored,
            summary.skipped
        )?;
        writeln!(out, "Time: {:.2?}", summary.duration)?;
        writeln!(out, "{}", rationale(summary))
    }

    fn paint<F>(&self, text: &str, style: F) -> String
    where
        F: Fn(&str) -> ColoredString,
    {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }
}

fn render_json<W: Write>(report: &Report, out: &mut W) -> io::Result<()> {
    let json = JsonReport {
        summary: summarize(report),
        exit_code: exit_code(report),
        report,
    };
    serde_json::to_writer_pretty(&mut *out, &json)?;
    writeln!(out)
}

/// Explain the exit code in one line
fn rationale(summary: &Summary) -> String {
    if summary.is_success() {
        if summary.skipped > 0 {
            format!(
                "Exit code 0: no failures ({} skipped)",
                summary.skipped
            )
        } else {
            "Exit code 0: all cases passed".to_string()
        }
    } else {
        let failing = summary.failed + summary.errored;
        format!(
            "Exit code 1: {} case{} failed or errored",
            failing,
            if failing == 1 { "" } else { "s" }
        )
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or(message)
}
