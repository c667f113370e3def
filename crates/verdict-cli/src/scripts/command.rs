//! Command execution for script cases
//!
//! Commands run in the case's scratch directory with `VERDICT_CASE` and
//! `VERDICT_CASE_DIR` set. The runner polls the child and the case's
//! cancellation flag; a cancelled case kills its command.

use super::CommandSpec;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use verdict::assert::expect_contains;
use verdict::{AssertionFailure, CaseContext, CaseError, CaseResult};

/// Environment variable holding the qualified case name
pub const ENV_CASE: &str = "VERDICT_CASE";
/// Environment variable holding the scratch directory
pub const ENV_CASE_DIR: &str = "VERDICT_CASE_DIR";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    fn status_label(&self) -> String {
        match self.status {
            Some(code) => code.to_string(),
            None => "terminated by signal".to_string(),
        }
    }

    /// First non-blank stderr line, for failure messages
    fn stderr_hint(&self) -> Option<&str> {
        self.stderr
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
    }
}

/// What a case expects from its command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expectation {
    pub status: i32,
    pub stdout: Option<String>,
    pub stdout_contains: Option<String>,
}

impl Expectation {
    /// Compare a command's output against the expectation
    pub fn check(&self, output: &CommandOutput) -> CaseResult {
        if output.status != Some(self.status) {
            let message = match output.stderr_hint() {
                Some(hint) => format!("unexpected exit status; stderr: {}", hint),
                None => "unexpected exit status".to_string(),
            };
            return Err(AssertionFailure::mismatch(
                self.status.to_string(),
                output.status_label(),
                message,
            )
            .into());
        }

        if let Some(expected) = &self.stdout {
            if &output.stdout != expected {
                return Err(AssertionFailure::mismatch(
                    format!("{:?}", expected),
                    format!("{:?}", output.stdout),
                    "stdout differs",
                )
                .into());
            }
        }

        if let Some(needle) = &self.stdout_contains {
            expect_contains(&output.stdout, needle)?;
        }

        Ok(())
    }
}

/// Run a command to completion or until the case is cancelled
pub fn execute(ctx: &CaseContext, spec: &CommandSpec) -> Result<CommandOutput, CaseError> {
    let dir = ctx.temp_dir()?;

    let mut command = match spec {
        CommandSpec::Shell(script) => {
            let mut command = Command::new("sh");
            command.arg("-c").arg(script);
            command
        }
        CommandSpec::Argv(argv) => {
            let (program, args) = argv
                .split_first()
                .ok_or_else(|| CaseError::uncaught("spawn", "empty command"))?;
            let mut command = Command::new(program);
            command.args(args);
            command
        }
    };

    command
        .current_dir(&dir)
        .env(ENV_CASE, ctx.name())
        .env(ENV_CASE_DIR, &dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    tracing::debug!(case = %ctx.name(), command = ?spec, "spawning command");
    let mut child = command
        .spawn()
        .map_err(|e| CaseError::from_error("spawn", &e))?;

    let stdout = capture(child.stdout.take());
    let stderr = capture(child.stderr.take());

    let status = wait(ctx, &mut child)?;

    Ok(CommandOutput {
        status: status.code(),
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

/// Run a hook command; any non-zero exit is an error of kind `hook`
pub fn run_hook(ctx: &CaseContext, hook: &str, spec: &CommandSpec) -> CaseResult {
    let output = execute(ctx, spec)?;
    if output.status == Some(0) {
        return Ok(());
    }

    tracing::debug!(case = %ctx.name(), hook, status = ?output.status, "hook command failed");
    let mut message = format!("command exited with status {}", output.status_label());
    if let Some(hint) = output.stderr_hint() {
        message.push_str("; stderr: ");
        message.push_str(hint);
    }
    Err(CaseError::uncaught("hook", message))
}

/// Poll the child until it exits, killing it when the case is cancelled
fn wait(ctx: &CaseContext, child: &mut Child) -> Result<ExitStatus, CaseError> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }

        if let Err(cancelled) = ctx.checkpoint() {
            if let Err(e) = child.kill() {
                tracing::warn!(case = %ctx.name(), "failed to kill command: {}", e);
            }
            // Reap the child; its output is discarded
            let _ = child.wait();
            return Err(cancelled);
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Drain a pipe on its own thread so the child never blocks on a full pipe
fn capture<R>(pipe: Option<R>) -> Option<JoinHandle<String>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            String::from_utf8_lossy(&buffer).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
