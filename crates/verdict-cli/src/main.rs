use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::*;
use std::io;
use std::path::PathBuf;

mod commands;
mod config;
mod scripts;

/// Exit status for invocation and configuration errors
const EXIT_USAGE: i32 = 2;

/// Verdict test runner.
///
/// Discovers script suites (`*.suite.toml` files) in a directory tree, runs
/// them with isolation, timeouts and optional parallelism, and reports the
/// outcome of every case.
///
/// EXAMPLES:
///     verdict run                      Run every discovered suite
///     verdict run db::queries          Run one nested suite
///     verdict run --tag fast --jobs 4  Run tagged cases on 4 workers
///     verdict list --json              List cases as JSON
///
/// EXIT STATUS:
///     0  all selected cases passed or were skipped
///     1  at least one case failed or errored
///     2  invalid invocation, configuration or suite files
///
/// ENVIRONMENT VARIABLES:
///     TEST_PARALLELISM  Worker count for parallel suites
///     VERDICT_FORMAT    Default report format (text or json)
///     VERDICT_TIMEOUT   Default per-case timeout in seconds
///     VERDICT_LOG       Log filter (e.g. 'debug' or 'verdict=trace')
///     NO_COLOR          Any non-empty value disables colored output
#[derive(Parser)]
#[command(name = "verdict")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run script suites
    ///
    /// Settings come from ~/.verdict/config.toml, then verdict.toml, then
    /// environment variables; flags override all of them.
    ///
    /// EXAMPLES:
    ///     verdict run                         Run everything
    ///     verdict run parser --fail-fast      Stop at the first failure
    ///     verdict run --filter dns -v         Show every matching case
    ///     verdict run --format json > out.json
    #[command(visible_alias = "r")]
    Run {
        /// Suite path such as 'parser::dialects' ('*' or omitted for all)
        selector: Option<String>,
        /// Only run cases with this tag (repeatable, any-of)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
        /// Skip cases with this tag (repeatable)
        #[arg(long = "exclude-tag")]
        exclude_tags: Vec<String>,
        /// Only run cases whose qualified name contains PATTERN
        #[arg(long)]
        filter: Option<String>,
        /// Default per-case timeout in seconds
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<f64>,
        /// Stop after the first failed or errored case
        #[arg(long)]
        fail_fast: bool,
        /// Report format
        #[arg(long, value_parser = ["text", "json"])]
        format: Option<String>,
        /// Suite directory (defaults to the project's discovery root)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Worker threads for running top-level suites in parallel
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
        /// Shuffle case order within suites using SEED
        #[arg(long, value_name = "SEED")]
        shuffle: Option<u64>,
        /// Verbose output (list passing cases, debug logging)
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Disable colored output (also set by a non-empty NO_COLOR)
        #[arg(long)]
        no_color: bool,
    },

    /// List the cases a run would execute
    ///
    /// EXAMPLES:
    ///     verdict list                 List every case
    ///     verdict list db --tag slow   List slow cases under 'db'
    ///     verdict list --filter dns    List cases whose name contains 'dns'
    #[command(visible_alias = "ls")]
    List {
        /// Suite path such as 'parser::dialects' ('*' or omitted for all)
        selector: Option<String>,
        /// Only list cases with this tag (repeatable, any-of)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
        /// Leave out cases with this tag (repeatable)
        #[arg(long = "exclude-tag")]
        exclude_tags: Vec<String>,
        /// Only list cases whose qualified name contains PATTERN
        #[arg(long)]
        filter: Option<String>,
        /// Suite directory (defaults to the project's discovery root)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     verdict completions bash > ~/.local/share/bash-completion/completions/verdict
    ///     verdict completions zsh > ~/.zfunc/_verdict
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });
    init_logging(cli_config.log_directives(verbose));

    let code = match dispatch(cli, &cli_config) {
        Ok(code) => code,
        Err(e) => {
            let label = if cli_config.no_color {
                "error:".to_string()
            } else {
                "error:".red().bold().to_string()
            };
            eprintln!("{} {:#}", label, e);
            EXIT_USAGE
        }
    };
    std::process::exit(code);
}

fn dispatch(cli: Cli, cli_config: &config::Config) -> Result<i32> {
    match cli.command {
        Commands::Run {
            selector,
            tags,
            exclude_tags,
            filter,
            timeout,
            fail_fast,
            format,
            dir,
            jobs,
            shuffle,
            verbose,
            no_color,
        } => {
            let settings = load_settings()?;
            let args = commands::run::RunArgs {
                selector,
                tags,
                exclude_tags,
                filter,
                timeout,
                fail_fast,
                format,
                dir,
                jobs,
                shuffle,
                verbose,
                no_color: no_color || cli_config.no_color,
            };
            commands::run::run(args, &settings)
        }
        Commands::List {
            selector,
            tags,
            exclude_tags,
            filter,
            dir,
            json,
        } => {
            let settings = load_settings()?;
            let args = commands::list::ListArgs {
                selector,
                tags,
                exclude_tags,
                filter,
                dir,
                json,
            };
            commands::list::run(args, &settings)?;
            Ok(0)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(0)
        }
    }
}

/// Layered settings for the current directory
fn load_settings() -> Result<verdict_config::Config> {
    let cwd = std::env::current_dir()?;
    let settings = verdict_config::ConfigLoader::new().load_from_directory(&cwd)?;
    Ok(settings)
}

/// Install the stderr log subscriber
fn init_logging(directives: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_smoke() {
        let _cli = Cli::parse_from(["verdict", "run"]);
    }

    #[test]
    fn test_cli_run_flags() {
        let cli = Cli::parse_from([
            "verdict",
            "run",
            "db::queries",
            "--tag",
            "fast",
            "-t",
            "smoke",
            "--exclude-tag",
            "slow",
            "--timeout",
            "1.5",
            "--fail-fast",
            "--format",
            "json",
            "-j",
            "4",
            "--shuffle",
            "7",
        ]);
        match cli.command {
            Commands::Run {
                selector,
                tags,
                exclude_tags,
                timeout,
                fail_fast,
                format,
                jobs,
                shuffle,
                ..
            } => {
                assert_eq!(selector.as_deref(), Some("db::queries"));
                assert_eq!(tags, vec!["fast", "smoke"]);
                assert_eq!(exclude_tags, vec!["slow"]);
                assert_eq!(timeout, Some(1.5));
                assert!(fail_fast);
                assert_eq!(format.as_deref(), Some("json"));
                assert_eq!(jobs, Some(4));
                assert_eq!(shuffle, Some(7));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["verdict", "run", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_cli_list_alias() {
        let cli = Cli::parse_from([
            "verdict",
            "ls",
            "--json",
            "--exclude-tag",
            "slow",
            "--filter",
            "dns",
        ]);
        match cli.command {
            Commands::List {
                json,
                exclude_tags,
                filter,
                ..
            } => {
                assert!(json);
                assert_eq!(exclude_tags, vec!["slow"]);
                assert_eq!(filter.as_deref(), Some("dns"));
            }
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
