//! Structured lifecycle events for a workspace run.
//!
//! Each stage of the pipeline emits one `info!` event with a stable `event`
//! field, so JSON logs can be filtered by stage.

use std::path::Path;

use tracing::info;

/// RAII guard that tags every event emitted during a run with the branch.
///
/// ```ignore
/// let _span = WorkspaceSpan::enter("feature/x");
/// // events below carry branch = "feature/x"
/// ```
pub struct WorkspaceSpan {
    _span: tracing::span::EnteredSpan,
}

impl WorkspaceSpan {
    pub fn enter(branch: &str) -> Self {
        let span = tracing::info_span!("cae.workspace", branch = %branch);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_workspace_prepared(dir: &Path, repo_count: usize) {
    info!(
        event = "workspace.prepared",
        dir = %dir.display(),
        repo_count = repo_count,
    );
}

/// Emit event: one repository finished syncing.
///
/// `cloned` is true when this run created the checkout.
pub fn emit_repo_synced(repo: &str, branch_state: &str, cloned: bool) {
    info!(
        event = "repo.synced",
        repo = %repo,
        branch_state = %branch_state,
        cloned = cloned,
    );
}

pub fn emit_context_rendered(path: &Path, ticket: Option<&str>) {
    info!(
        event = "context.rendered",
        path = %path.display(),
        ticket = ticket.unwrap_or(""),
    );
}

pub fn emit_assistant_launched(binary: &Path, dir: &Path) {
    info!(
        event = "assistant.launched",
        binary = %binary.display(),
        dir = %dir.display(),
    );
}

/// Emit event: a non-fatal step failed (warning level).
pub fn emit_step_warning(repo: &str, step: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "step.warning", repo = %repo, step = %step, error = %error);
}
