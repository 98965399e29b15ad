//! The workspace pipeline: resolve, create, sync, render.
//!
//! Everything that can fail without touching the filesystem (repository
//! lookup, template resolution) runs before the workspace is created.

use std::path::PathBuf;

use crate::config::Config;
use crate::context::{write_context, Template};
use crate::error::Result;
use crate::git::CommandRunner;
use crate::obs::{self, WorkspaceSpan};
use crate::sync::{RepositorySynchronizer, SyncReport};
use crate::workspace::{TaskContext, Workspace};

/// Inputs for [`prepare_workspace`] beyond the configuration.
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    /// Directory the workspace is created in.
    pub root: PathBuf,
    /// Explicit template path; takes precedence over `template_dir`.
    pub template: Option<PathBuf>,
    /// Directory searched for a custom `claude_template.md`.
    pub template_dir: PathBuf,
}

impl PrepareOptions {
    /// Create the workspace in `dir` and look for a custom template there.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        PrepareOptions {
            root: dir.clone(),
            template: None,
            template_dir: dir,
        }
    }
}

/// A fully prepared workspace, ready for the assistant.
#[derive(Debug)]
pub struct PreparedWorkspace {
    pub workspace: Workspace,
    pub task: TaskContext,
    pub reports: Vec<SyncReport>,
    pub context_path: PathBuf,
}

/// Build the workspace for `branch` containing `repos`.
pub fn prepare_workspace<S: AsRef<str>>(
    config: &Config,
    runner: &dyn CommandRunner,
    branch: &str,
    repos: &[S],
    options: &PrepareOptions,
) -> Result<PreparedWorkspace> {
    let task = TaskContext::new(config, branch, repos)?;
    let template = Template::resolve(options.template.as_deref(), &options.template_dir)?;

    let _span = WorkspaceSpan::enter(branch);
    let workspace = Workspace::prepare(&options.root, branch)?;
    obs::emit_workspace_prepared(workspace.dir(), task.repositories.len());

    let reports =
        RepositorySynchronizer::new(runner, &workspace).sync_all(&task.repositories, branch)?;
    let context_path = write_context(&workspace, &task, &template)?;

    Ok(PreparedWorkspace {
        workspace,
        task,
        reports,
        context_path,
    })
}
