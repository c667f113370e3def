//! Script suites - command-based cases declared in `*.suite.toml` files

pub mod command;
pub mod discovery;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use verdict::case::Hook;
use verdict::{CaseContext, TestCase};

pub use command::Expectation;
pub use discovery::discover;

/// A command given either as a shell string or as an argv array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    /// Run through `sh -c`
    Shell(String),
    /// Program followed by its arguments, run without a shell
    Argv(Vec<String>),
}

impl CommandSpec {
    fn validate(&self) -> Result<()> {
        match self {
            CommandSpec::Shell(script) if script.trim().is_empty() => {
                bail!("command cannot be empty")
            }
            CommandSpec::Argv(argv) if argv.is_empty() => bail!("argv cannot be empty"),
            _ => Ok(()),
        }
    }
}

/// Parsed contents of a suite file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteFile {
    /// Settings shared by every case in the file
    #[serde(default)]
    pub suite: SuiteSettings,

    #[serde(default, rename = "case")]
    pub cases: Vec<CaseSpec>,
}

/// `[suite]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteSettings {
    #[serde(default)]
    pub tags: Vec<String>,
    pub timeout_secs: Option<f64>,
    pub before_each: Option<CommandSpec>,
    pub after_each: Option<CommandSpec>,
}

/// One `[[case]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseSpec {
    pub name: String,
    pub run: CommandSpec,
    /// Exact expected stdout
    pub stdout: Option<String>,
    /// Substring expected somewhere in stdout
    pub stdout_contains: Option<String>,
    /// Expected exit status
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    pub timeout_secs: Option<f64>,
    /// Reason for never running the case
    pub ignore: Option<String>,
    /// Error kind the case is expected to raise
    pub should_error: Option<String>,
}

impl SuiteFile {
    /// Read and parse a suite file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read suite file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid suite file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: Self = toml::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    fn validate(&self) -> Result<()> {
        if let Some(secs) = self.suite.timeout_secs {
            timeout_from_secs(secs).context("suite.timeout_secs")?;
        }
        for spec in [&self.suite.before_each, &self.suite.after_each]
            .into_iter()
            .flatten()
        {
            spec.validate()?;
        }
        for case in &self.cases {
            case.run
                .validate()
                .with_context(|| format!("case '{}'", case.name))?;
            if let Some(secs) = case.timeout_secs {
                timeout_from_secs(secs)
                    .with_context(|| format!("case '{}': timeout_secs", case.name))?;
            }
        }
        Ok(())
    }

    /// Build test cases, applying suite settings to each one
    pub fn into_cases(self) -> Result<Vec<TestCase>> {
        let settings = self.suite;
        let before_each = settings.before_each.map(|spec| hook("before_each", spec));
        let after_each = settings.after_each.map(|spec| hook("after_each", spec));

        self.cases
            .into_iter()
            .map(|spec| {
                let mut case = build_case(spec, settings.timeout_secs)?
                    .with_tags(settings.tags.iter().cloned());
                if let Some(hook) = &before_each {
                    case = case.with_before_each_hook(Arc::clone(hook));
                }
                if let Some(hook) = &after_each {
                    case = case.with_after_each_hook(Arc::clone(hook));
                }
                Ok(case)
            })
            .collect()
    }
}

fn build_case(spec: CaseSpec, suite_timeout: Option<f64>) -> Result<TestCase> {
    let expectation = Expectation {
        status: spec.status,
        stdout: spec.stdout,
        stdout_contains: spec.stdout_contains,
    };
    let run = spec.run;

    let mut case = TestCase::new(spec.name, move |ctx| {
        let output = command::execute(ctx, &run)?;
        expectation.check(&output)
    })
    .with_tags(spec.tags);

    if let Some(secs) = spec.timeout_secs.or(suite_timeout) {
        case = case.with_timeout(timeout_from_secs(secs)?);
    }
    if let Some(reason) = spec.ignore {
        case = case.ignore(reason);
    }
    if let Some(kind) = spec.should_error {
        case = case.should_error(kind);
    }
    Ok(case)
}

/// Hook that runs `spec` and requires a zero exit status
fn hook(name: &'static str, spec: CommandSpec) -> Hook {
    Arc::new(move |ctx: &CaseContext| command::run_hook(ctx, name, &spec))
}

pub(crate) fn timeout_from_secs(secs: f64) -> Result<Duration> {
    if secs <= 0.0 {
        bail!("timeout must be a positive number of seconds, got {}", secs);
    }
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("timeout of {} seconds is out of range", secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let file = SuiteFile::parse(
            r#"
[suite]
tags = ["db"]
timeout_secs = 5
before_each = "mkdir -p data"
after_each = ["rm", "-rf", "data"]

[[case]]
name = "prints_greeting"
run = "echo hello"
stdout = "hello\n"
tags = ["fast"]

[[case]]
name = "lists"
run = ["ls", "-a"]
status = 0
ignore = "flaky on CI"
"#,
        )
        .unwrap();

        assert_eq!(file.suite.tags, vec!["db"]);
        assert_eq!(
            file.suite.after_each,
            Some(CommandSpec::Argv(vec![
                "rm".to_string(),
                "-rf".to_string(),
                "data".to_string()
            ]))
        );
        assert_eq!(file.cases.len(), 2);
        assert_eq!(file.cases[0].run, CommandSpec::Shell("echo hello".into()));
        assert_eq!(file.cases[1].ignore.as_deref(), Some("flaky on CI"));

        let cases = file.into_cases().unwrap();
        assert!(cases[0].has_tag("db"));
        assert!(cases[0].has_tag("fast"));
        assert_eq!(cases[0].timeout(), Some(Duration::from_secs(5)));
        assert!(cases[0].before_each().is_some());
        assert!(cases[1].after_each().is_some());
        assert_eq!(cases[1].ignored(), Some("flaky on CI"));
    }

    #[test]
    fn test_empty_file_has_no_cases() {
        let file = SuiteFile::parse("").unwrap();
        assert!(file.cases.is_empty());
    }

    #[test]
    fn test_rejects_bad_files() {
        for content in [
            "[[case]]\nname = \"x\"\n",
            "[[case]]\nname = \"x\"\nrun = \"true\"\nexpect = 1\n",
            "[[case]]\nname = \"x\"\nrun = []\n",
            "[[case]]\nname = \"x\"\nrun = \"true\"\ntimeout_secs = 0\n",
            "[suite]\nbefore_each = \" \"\n",
            "[suite]\ntimeout_secs = 1e300\n",
            "[[case]]\nname = \"x\"\nrun = \"true\"\ntimeout_secs = 1e300\n",
        ] {
            assert!(SuiteFile::parse(content).is_err(), "accepted: {}", content);
        }
    }

    #[test]
    fn test_timeout_from_secs() {
        assert_eq!(timeout_from_secs(0.25).unwrap(), Duration::from_millis(250));
        for secs in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e300] {
            assert!(timeout_from_secs(secs).is_err(), "accepted {}", secs);
        }
    }

    #[test]
    fn test_case_timeout_overrides_suite() {
        let file = SuiteFile::parse(
            "[suite]\ntimeout_secs = 5\n\
             [[case]]\nname = \"x\"\nrun = \"true\"\ntimeout_secs = 0.5\n",
        )
        .unwrap();
        let cases = file.into_cases().unwrap();
        assert_eq!(cases[0].timeout(), Some(Duration::from_millis(500)));
    }
}
