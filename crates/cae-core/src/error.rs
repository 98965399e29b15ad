//! Error taxonomy for workspace preparation.

use std::path::PathBuf;

/// Errors that stop a workspace run.
///
/// A missing assistant CLI is deliberately absent here: it is reported as a
/// warning by [`crate::launcher`] and never fails the run.
#[derive(Debug, thiserror::Error)]
pub enum CaeError {
    #[error("configuration error in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("unknown repository '{name}' (configured: {})", display_names(.available))]
    UnknownRepository {
        name: String,
        available: Vec<String>,
    },

    #[error("failed to sync repository '{repo}': `{command}` exited with {status}{}", display_stderr(.stderr))]
    RepositorySync {
        repo: String,
        command: String,
        status: String,
        stderr: String,
    },

    #[error("repository '{repo}' could not be cloned from {url}: repository not found")]
    RepositoryNotFound { repo: String, url: String },

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template error for {path}: {message}")]
    Template { path: PathBuf, message: String },

    #[error("invalid workspace: {0}")]
    Workspace(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaeError {
    pub(crate) fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        CaeError::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn template(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        CaeError::Template {
            path: path.into(),
            message: message.into(),
        }
    }
}

fn display_names(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

fn display_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Result type for workspace operations.
pub type Result<T> = std::result::Result<T, CaeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = CaeError::config("/tmp/cae_config.json", "missing field `repositories`");
        let msg = err.to_string();
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("cae_config.json"));
        assert!(msg.contains("repositories"));
    }

    #[test]
    fn test_unknown_repository_lists_available() {
        let err = CaeError::UnknownRepository {
            name: "docs".to_string(),
            available: vec!["backend".to_string(), "frontend".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'docs'"));
        assert!(msg.contains("backend, frontend"));

        let err = CaeError::UnknownRepository {
            name: "docs".to_string(),
            available: vec![],
        };
        assert!(err.to_string().contains("configured: none"));
    }

    #[test]
    fn test_repository_sync_error_names_repo_and_command() {
        let err = CaeError::RepositorySync {
            repo: "backend".to_string(),
            command: "git checkout main".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "error: pathspec 'main' did not match\n".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'backend'"));
        assert!(msg.contains("`git checkout main`"));
        assert!(msg.ends_with("did not match"));
    }

    #[test]
    fn test_repository_sync_error_without_stderr() {
        let err = CaeError::RepositorySync {
            repo: "backend".to_string(),
            command: "git fetch --all".to_string(),
            status: "exit status: 128".to_string(),
            stderr: "  ".to_string(),
        };
        assert!(err.to_string().ends_with("exit status: 128"));
    }
}
