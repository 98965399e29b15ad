//! Multi-repository task workspaces.
//!
//! Checks out one branch across several repositories inside a per-task
//! directory, renders a context document for the assistant, and launches
//! the assistant CLI in that directory.

pub mod config;
pub mod context;
pub mod error;
pub mod git;
pub mod launcher;
pub mod obs;
pub mod pipeline;
pub mod sync;
pub mod telemetry;
pub mod ticket;
pub mod update;
pub mod workspace;

pub use config::{Config, RepositoryConfig, CONFIG_FILE_NAME, DEFAULT_TICKET_PREFIXES};
pub use context::{
    render_template, write_context, Template, TemplateSource, TemplateValues, DEFAULT_TEMPLATE,
    TEMPLATE_FILE_NAME,
};
pub use error::{CaeError, Result};
pub use git::{current_branch, is_git_repo, CommandOutput, CommandRunner, SystemRunner};
pub use launcher::{LaunchOutcome, Launcher, ASSISTANT_BINARY};
pub use pipeline::{prepare_workspace, PrepareOptions, PreparedWorkspace};
pub use sync::{BranchState, RepositorySynchronizer, SyncReport};
pub use telemetry::init_tracing;
pub use ticket::{extract_ticket, Ticket};
pub use update::{check_for_update, UpdateChecker, UpdateInfo};
pub use workspace::{derive_directory_name, TaskContext, Workspace, CONTEXT_FILE_NAME};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
