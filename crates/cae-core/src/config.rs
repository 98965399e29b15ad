//! Repository configuration (`cae_config.json`).
//!
//! The file is read once at startup into an immutable [`Config`] that every
//! stage borrows. All validation happens here, so later stages can rely on
//! repository names being safe directory names and URLs being non-empty.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CaeError, Result};

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = "cae_config.json";

/// Ticket prefixes used when the configuration does not list any.
pub const DEFAULT_TICKET_PREFIXES: &[&str] = &["eng", "des", "ops"];

/// One configured repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Map key from the configuration file; also the checkout directory name.
    #[serde(skip)]
    pub name: String,
    /// Clone URL passed verbatim to `git clone`.
    pub url: String,
    /// Free-form tag such as `ios` or `web`. Informational only.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Build command, run from the workspace root after `cd <name>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    /// Test command, run from the workspace root after `cd <name>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    /// Shell command run inside the checkout after every sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    repositories: IndexMap<String, RepositoryConfig>,
    #[serde(default)]
    linear_base_url: Option<String>,
    #[serde(default)]
    ticket_prefixes: Option<Vec<String>>,
}

/// Parsed and validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    repositories: IndexMap<String, RepositoryConfig>,
    linear_base_url: Option<String>,
    ticket_prefixes: Vec<String>,
    source: PathBuf,
}

impl Config {
    /// Load and validate the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CaeError::config(
                path,
                format!("file not found; create {CONFIG_FILE_NAME} in your project root"),
            ));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| CaeError::config(path, format!("failed to read: {e}")))?;
        debug!(path = %path.display(), "loaded configuration file");

        Self::parse(&text, path)
    }

    /// Parse configuration from an in-memory JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        Self::parse(text, Path::new("<inline>"))
    }

    fn parse(text: &str, source: &Path) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(text)
            .map_err(|e| CaeError::config(source, format!("invalid JSON: {e}")))?;

        let mut repositories = IndexMap::with_capacity(raw.repositories.len());
        for (name, mut repo) in raw.repositories {
            validate_repo_name(&name).map_err(|msg| CaeError::config(source, msg))?;
            if repo.url.trim().is_empty() {
                return Err(CaeError::config(
                    source,
                    format!("repository '{name}' has an empty url"),
                ));
            }
            repo.name = name.clone();
            repositories.insert(name, repo);
        }

        let ticket_prefixes = match raw.ticket_prefixes {
            Some(prefixes) => {
                if prefixes.iter().any(|p| p.trim().is_empty()) {
                    return Err(CaeError::config(
                        source,
                        "ticket_prefixes must not contain empty entries",
                    ));
                }
                prefixes
            }
            None => DEFAULT_TICKET_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        };

        let linear_base_url = raw
            .linear_base_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Ok(Config {
            repositories,
            linear_base_url,
            ticket_prefixes,
            source: source.to_path_buf(),
        })
    }

    /// Look up a repository by name.
    pub fn repository(&self, name: &str) -> Result<&RepositoryConfig> {
        self.repositories
            .get(name)
            .ok_or_else(|| CaeError::UnknownRepository {
                name: name.to_string(),
                available: self.repository_names(),
            })
    }

    /// Resolve every requested name, preserving request order.
    ///
    /// Runs before the workspace is touched: one unknown name fails the
    /// whole selection. Repeated names are kept once.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<RepositoryConfig>> {
        let mut selected: Vec<RepositoryConfig> = Vec::with_capacity(names.len());
        for name in names {
            let repo = self.repository(name.as_ref())?;
            if !selected.iter().any(|r| r.name == repo.name) {
                selected.push(repo.clone());
            }
        }
        Ok(selected)
    }

    /// Repository names in the order they appear in the file.
    pub fn repository_names(&self) -> Vec<String> {
        self.repositories.keys().cloned().collect()
    }

    pub fn linear_base_url(&self) -> Option<&str> {
        self.linear_base_url.as_deref()
    }

    /// Configured ticket prefixes, or [`DEFAULT_TICKET_PREFIXES`].
    pub fn ticket_prefixes(&self) -> &[String] {
        &self.ticket_prefixes
    }

    /// Path the configuration was read from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// GitHub organisation of the first `https://github.com/<org>/...` URL,
    /// in file order.
    pub fn github_org(&self) -> Option<String> {
        self.repositories.values().find_map(|repo| {
            repo.url
                .strip_prefix("https://github.com/")
                .and_then(|rest| rest.split('/').next())
                .filter(|org| !org.is_empty())
                .map(str::to_string)
        })
    }
}

fn validate_repo_name(name: &str) -> std::result::Result<(), String> {
    if name.trim().is_empty() {
        return Err("repository names must not be empty".to_string());
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(format!(
            "repository name '{name}' must be a plain directory name"
        ));
    }
    Ok(())
}
