//! Repository synchronizer: put every selected repository on the task branch.
//!
//! Repositories are processed one at a time in request order. The first
//! required git command that fails aborts the run; repositories synced
//! before it are left as they are.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::RepositoryConfig;
use crate::error::{CaeError, Result};
use crate::git::{command_line, is_git_repo, CommandOutput, CommandRunner};
use crate::obs;
use crate::workspace::Workspace;

/// How the task branch was reached in one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchState {
    /// The branch already existed locally and was checked out.
    Existing,
    /// The branch existed only on `origin` and is now tracked locally.
    Tracked,
    /// The branch existed nowhere and was created from the default branch.
    Created,
}

impl fmt::Display for BranchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BranchState::Existing => "existing",
            BranchState::Tracked => "tracked",
            BranchState::Created => "created",
        };
        f.write_str(s)
    }
}

/// Outcome of syncing one repository.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub repo: String,
    pub path: PathBuf,
    /// True when this run performed the clone.
    pub cloned: bool,
    pub branch_state: BranchState,
    /// Non-fatal problems (failed pull, failed setup command).
    pub warnings: Vec<String>,
}

/// Drives git through a [`CommandRunner`] for each repository of a workspace.
pub struct RepositorySynchronizer<'a> {
    runner: &'a dyn CommandRunner,
    workspace: &'a Workspace,
}

impl<'a> RepositorySynchronizer<'a> {
    pub fn new(runner: &'a dyn CommandRunner, workspace: &'a Workspace) -> Self {
        Self { runner, workspace }
    }

    /// Sync `repos` in order, stopping at the first failure.
    pub fn sync_all(&self, repos: &[RepositoryConfig], branch: &str) -> Result<Vec<SyncReport>> {
        let mut reports = Vec::with_capacity(repos.len());
        for repo in repos {
            reports.push(self.sync(repo, branch)?);
        }
        Ok(reports)
    }

    /// Clone or fetch one repository, then switch it to `branch`.
    pub fn sync(&self, repo: &RepositoryConfig, branch: &str) -> Result<SyncReport> {
        let path = self.workspace.repo_path(&repo.name);
        let session = RepoSession {
            runner: self.runner,
            repo: &repo.name,
            path: &path,
        };
        let mut warnings = Vec::new();

        let cloned = if path.exists() {
            if !is_git_repo(self.runner, &path) {
                return Err(CaeError::Workspace(format!(
                    "{} exists but is not a git repository",
                    path.display()
                )));
            }
            info!(repo = %repo.name, "repository already present, fetching");
            session.checked(&["fetch", "--all"])?;
            false
        } else {
            info!(repo = %repo.name, url = %repo.url, "cloning repository");
            session.clone_repo(&repo.url)?;
            true
        };

        let local = session.query(&["branch", "--list", branch])?;
        let remote = session.remote_has_branch(branch)?;
        debug!(repo = %repo.name, local, remote, "branch lookup");

        let branch_state = if local {
            session.checked(&["checkout", branch])?;
            if remote {
                if let Err(e) = session.checked(&["pull", "origin", branch]) {
                    obs::emit_step_warning(&repo.name, "pull", &e);
                    warnings.push(format!("could not pull latest changes: {e}"));
                }
            }
            BranchState::Existing
        } else if remote {
            let tracking = format!("origin/{branch}");
            if session
                .checked(&["checkout", "-b", branch, tracking.as_str()])
                .is_err()
            {
                session.checked(&["checkout", branch])?;
            }
            BranchState::Tracked
        } else {
            session.checkout_default_branch()?;
            if let Err(e) = session.checked(&["pull"]) {
                debug!(repo = %repo.name, error = %e, "pull of default branch failed");
            }
            session.checked(&["checkout", "-b", branch])?;
            BranchState::Created
        };

        if let Some(setup) = repo.setup.as_deref() {
            info!(repo = %repo.name, command = %setup, "running setup command");
            if let Err(e) = session.shell(setup) {
                obs::emit_step_warning(&repo.name, "setup", &e);
                warnings.push(format!("setup command failed: {e}"));
            }
        }

        obs::emit_repo_synced(&repo.name, &branch_state.to_string(), cloned);
        Ok(SyncReport {
            repo: repo.name.clone(),
            path,
            cloned,
            branch_state,
            warnings,
        })
    }
}

/// Git commands scoped to one repository checkout.
struct RepoSession<'a> {
    runner: &'a dyn CommandRunner,
    repo: &'a str,
    path: &'a Path,
}

impl RepoSession<'_> {
    fn clone_repo(&self, url: &str) -> Result<()> {
        let dest = self.path.to_string_lossy().into_owned();
        let args = ["clone", url, dest.as_str()];
        let output = self.runner.run("git", &args, None)?;
        if output.success {
            return Ok(());
        }
        if output.stderr.contains("Repository not found") || output.stderr.contains("404") {
            return Err(CaeError::RepositoryNotFound {
                repo: self.repo.to_string(),
                url: url.to_string(),
            });
        }
        Err(self.failure("git", &args, output))
    }

    fn checkout_default_branch(&self) -> Result<()> {
        if self.checked(&["checkout", "main"]).is_ok() {
            return Ok(());
        }
        let output = self.run(&["checkout", "master"])?;
        if output.success {
            return Ok(());
        }
        Err(CaeError::RepositorySync {
            repo: self.repo.to_string(),
            command: "git checkout main || git checkout master".to_string(),
            status: output.status,
            stderr: output.stderr,
        })
    }

    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        self.runner.run("git", args, Some(self.path))
    }

    /// Run a required git command; non-zero exit becomes a sync error.
    fn checked(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.run(args)?;
        if output.success {
            Ok(output)
        } else {
            Err(self.failure("git", args, output))
        }
    }

    /// Run a listing command and report whether it printed anything.
    fn query(&self, args: &[&str]) -> Result<bool> {
        Ok(!self.checked(args)?.stdout.trim().is_empty())
    }

    /// `ls-remote` patterns match ref tails, so `x` would also hit
    /// `refs/heads/feature/x`. Ask for the full ref and compare names.
    fn remote_has_branch(&self, branch: &str) -> Result<bool> {
        let full_ref = format!("refs/heads/{branch}");
        let output = self.checked(&["ls-remote", "--heads", "origin", full_ref.as_str()])?;
        Ok(output
            .stdout
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .any(|name| name == full_ref))
    }

    fn shell(&self, script: &str) -> Result<CommandOutput> {
        let args = ["-c", script];
        let output = self.runner.run("sh", &args, Some(self.path))?;
        if output.success {
            Ok(output)
        } else {
            Err(self.failure("sh", &args, output))
        }
    }

    fn failure(&self, program: &str, args: &[&str], output: CommandOutput) -> CaeError {
        CaeError::RepositorySync {
            repo: self.repo.to_string(),
            command: command_line(program, args),
            status: output.status,
            stderr: output.stderr,
        }
    }
}
