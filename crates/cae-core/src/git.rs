//! Subprocess execution and small git queries.
//!
//! Every external command goes through [`CommandRunner`] so the repository
//! synchronizer can be driven by a scripted runner in tests.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{CaeError, Result};

/// Captured result of one finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the process exited with status 0.
    pub success: bool,
    /// Human-readable exit status, e.g. `exit status: 128`.
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful result with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        CommandOutput {
            success: true,
            status: "exit status: 0".to_string(),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed result with exit code 1 and the given stderr.
    pub fn failed(stderr: impl Into<String>) -> Self {
        CommandOutput {
            success: false,
            status: "exit status: 1".to_string(),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs an external program to completion and captures its output.
///
/// Returns `Err` only when the program could not be started; a non-zero
/// exit is reported through [`CommandOutput::success`].
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
        let line = command_line(program, args);
        debug!(command = %line, cwd = ?cwd, "running command");

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        // Never block on a credential prompt; the error surfaces instead.
        cmd.env("GIT_TERMINAL_PROMPT", "0");

        let output = cmd.output().map_err(|source| CaeError::Spawn {
            command: line,
            source,
        })?;

        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Render a program and its arguments as a single display string.
pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check whether a directory is inside a git work tree.
pub fn is_git_repo(runner: &dyn CommandRunner, dir: &Path) -> bool {
    runner
        .run("git", &["rev-parse", "--is-inside-work-tree"], Some(dir))
        .map(|o| o.success && o.stdout.trim() == "true")
        .unwrap_or(false)
}

/// Name of the branch currently checked out in `dir`.
pub fn current_branch(runner: &dyn CommandRunner, dir: &Path) -> Result<String> {
    let output = runner.run("git", &["rev-parse", "--abbrev-ref", "HEAD"], Some(dir))?;
    if !output.success {
        return Err(CaeError::RepositorySync {
            repo: dir.display().to_string(),
            command: "git rev-parse --abbrev-ref HEAD".to_string(),
            status: output.status,
            stderr: output.stderr,
        });
    }
    Ok(output.stdout.trim().to_string())
}
