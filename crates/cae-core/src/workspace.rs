//! Per-task workspace directory and the immutable task context.

use std::path::{Path, PathBuf};

use crate::config::{Config, RepositoryConfig};
use crate::error::{CaeError, Result};
use crate::ticket::{extract_ticket, Ticket};

/// File name of the rendered context document inside the workspace.
pub const CONTEXT_FILE_NAME: &str = "CLAUDE.md";

/// Directory name for a branch: every `/` becomes `-`.
pub fn derive_directory_name(branch: &str) -> String {
    branch.replace('/', "-")
}

/// The workspace directory for one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    /// Create `<root>/<derived name>` if it does not exist yet.
    pub fn prepare(root: &Path, branch: &str) -> Result<Self> {
        let dir = Self::locate(root, branch)?;
        std::fs::create_dir_all(&dir)?;
        Ok(Workspace { dir })
    }

    /// Compute the workspace path without touching the filesystem.
    pub fn locate(root: &Path, branch: &str) -> Result<PathBuf> {
        if branch.trim().is_empty() {
            return Err(CaeError::Workspace("branch name must not be empty".to_string()));
        }
        let name = derive_directory_name(branch);
        if name == "." || name == ".." {
            return Err(CaeError::Workspace(format!(
                "branch '{branch}' does not map to a usable directory name"
            )));
        }
        Ok(root.join(name))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Checkout directory for a repository.
    pub fn repo_path(&self, repo: &str) -> PathBuf {
        self.dir.join(repo)
    }

    pub fn context_path(&self) -> PathBuf {
        self.dir.join(CONTEXT_FILE_NAME)
    }
}

/// Everything known about the current task, built once per invocation.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub branch_name: String,
    pub directory_name: String,
    pub ticket: Option<Ticket>,
    pub repositories: Vec<RepositoryConfig>,
}

impl TaskContext {
    /// Resolve the requested repositories and extract ticket information.
    ///
    /// Fails on the first unknown repository name.
    pub fn new<S: AsRef<str>>(config: &Config, branch: &str, repos: &[S]) -> Result<Self> {
        let repositories = config.select(repos)?;
        let ticket = extract_ticket(branch, config.ticket_prefixes(), config.linear_base_url());
        Ok(TaskContext {
            branch_name: branch.to_string(),
            directory_name: derive_directory_name(branch),
            ticket,
            repositories,
        })
    }

    pub fn ticket_id(&self) -> Option<&str> {
        self.ticket.as_ref().map(|t| t.id.as_str())
    }

    pub fn ticket_url(&self) -> Option<&str> {
        self.ticket.as_ref().and_then(|t| t.url.as_deref())
    }
}
