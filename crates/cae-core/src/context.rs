//! Context document rendering.
//!
//! A template is plain text containing `{placeholder}` tokens. Rendering is a
//! single left-to-right pass: recognised tokens are replaced, anything else
//! between braces is copied through untouched, and substituted values are
//! never scanned again.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{CaeError, Result};
use crate::obs;
use crate::workspace::{TaskContext, Workspace};

/// Custom template file name, looked up in the invocation directory.
pub const TEMPLATE_FILE_NAME: &str = "claude_template.md";

/// Template used when no custom template is present.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/claude_template.md");

/// Placeholders understood by [`render_template`].
pub const PLACEHOLDERS: [&str; 6] = [
    "branch_name",
    "ticket_section",
    "ticket_reference",
    "repositories_list",
    "test_commands",
    "build_commands",
];

/// Where a template's text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Path given explicitly on the command line.
    Explicit(PathBuf),
    /// `claude_template.md` found in the invocation directory.
    Custom(PathBuf),
    Builtin,
}

#[derive(Debug, Clone)]
pub struct Template {
    text: String,
    source: TemplateSource,
}

impl Template {
    pub fn builtin() -> Self {
        Template {
            text: DEFAULT_TEMPLATE.to_string(),
            source: TemplateSource::Builtin,
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Template {
            text: text.into(),
            source: TemplateSource::Builtin,
        }
    }

    /// Pick the template for a run.
    ///
    /// An explicit path must be readable. Otherwise `claude_template.md` in
    /// `search_dir` wins over the built-in template; a custom file that
    /// exists but cannot be read is an error, not a silent fallback.
    pub fn resolve(explicit: Option<&Path>, search_dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            let text = read_template(path)?;
            return Ok(Template {
                text,
                source: TemplateSource::Explicit(path.to_path_buf()),
            });
        }

        let custom = search_dir.join(TEMPLATE_FILE_NAME);
        if custom.exists() {
            let text = read_template(&custom)?;
            debug!(path = %custom.display(), "using custom template");
            return Ok(Template {
                text,
                source: TemplateSource::Custom(custom),
            });
        }

        Ok(Self::builtin())
    }

    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn render(&self, values: &TemplateValues) -> String {
        render_template(&self.text, values)
    }
}

fn read_template(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| CaeError::template(path, e.to_string()))
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateValues {
    pub branch_name: String,
    pub ticket_section: String,
    pub ticket_reference: String,
    pub repositories_list: String,
    pub test_commands: String,
    pub build_commands: String,
}

impl TemplateValues {
    pub fn from_task(task: &TaskContext) -> Self {
        let (ticket_section, ticket_reference) = match (task.ticket_id(), task.ticket_url()) {
            (Some(id), Some(url)) => (
                format!("- **Linear Ticket**: {id}\n- **Linear URL**: {url}"),
                format!("Linear ticket [{id}]({url})"),
            ),
            (Some(id), None) => (format!("- **Linear Ticket**: {id}"), format!("ticket {id}")),
            (None, _) => (String::new(), "ticket [TICKET_ID]".to_string()),
        };

        let repositories_list = task
            .repositories
            .iter()
            .map(|repo| format!("- **{}**: {}", repo.name, repo.url))
            .collect::<Vec<_>>()
            .join("\n");

        let test_commands = command_block(
            task.repositories
                .iter()
                .map(|r| (r.name.as_str(), r.test.as_deref())),
            "# No test commands configured",
        );
        let build_commands = command_block(
            task.repositories
                .iter()
                .map(|r| (r.name.as_str(), r.build.as_deref())),
            "# No build commands configured",
        );

        TemplateValues {
            branch_name: task.branch_name.clone(),
            ticket_section,
            ticket_reference,
            repositories_list,
            test_commands,
            build_commands,
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "branch_name" => &self.branch_name,
            "ticket_section" => &self.ticket_section,
            "ticket_reference" => &self.ticket_reference,
            "repositories_list" => &self.repositories_list,
            "test_commands" => &self.test_commands,
            "build_commands" => &self.build_commands,
            _ => return None,
        };
        Some(value.as_str())
    }
}

/// One `\n# <repo>\ncd <repo> && <cmd>` entry per repository with a command.
fn command_block<'a>(
    commands: impl Iterator<Item = (&'a str, Option<&'a str>)>,
    empty: &str,
) -> String {
    let block: String = commands
        .filter_map(|(name, cmd)| cmd.map(|cmd| format!("\n# {name}\ncd {name} && {cmd}")))
        .collect();
    if block.is_empty() {
        format!("\n{empty}")
    } else {
        block
    }
}

/// Replace known `{placeholder}` tokens in `template` in a single pass.
pub fn render_template(template: &str, values: &TemplateValues) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let replaced = after
            .find('}')
            .and_then(|end| values.get(&after[..end]).map(|value| (value, end)));
        match replaced {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Render the context document for `task` and write it into the workspace.
pub fn write_context(workspace: &Workspace, task: &TaskContext, template: &Template) -> Result<PathBuf> {
    let content = template.render(&TemplateValues::from_task(task));
    let path = workspace.context_path();
    std::fs::write(&path, content)?;
    info!(path = %path.display(), source = ?template.source(), "wrote context document");
    obs::emit_context_rendered(&path, task.ticket_id());
    Ok(path)
}
