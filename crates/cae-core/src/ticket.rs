//! Ticket identifiers embedded in branch names.
//!
//! A ticket token is `<prefix>-<digits>` where the prefix is one of the
//! configured ticket prefixes, compared case-insensitively. The token must
//! be delimited by `-` or the segment boundary, so `eng-12` matches in
//! `eng-12-login` and `fix-eng-12` but not in `reng-12`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A ticket found in a branch name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Identifier as written in the branch, e.g. `eng-123`.
    pub id: String,
    /// Tracker URL, present when a tracker base URL is configured.
    pub url: Option<String>,
}

/// Find the ticket referenced by `branch`.
///
/// The leading `/`-separated segment is searched first, then the remaining
/// segments in order. Returns `None` when nothing matches.
pub fn extract_ticket(branch: &str, prefixes: &[String], base_url: Option<&str>) -> Option<Ticket> {
    let pattern = ticket_pattern(prefixes)?;

    let id = branch
        .split('/')
        .find_map(|segment| pattern.captures(segment))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())?;

    let url = base_url.map(|base| ticket_url(base, &id));
    debug!(ticket = %id, "extracted ticket from branch");
    Some(Ticket { id, url })
}

/// Join a tracker base URL and a ticket id.
pub fn ticket_url(base_url: &str, id: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), id)
}

fn ticket_pattern(prefixes: &[String]) -> Option<Regex> {
    let alternatives: Vec<String> = prefixes
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(regex::escape)
        .collect();
    if alternatives.is_empty() {
        return None;
    }

    let pattern = format!(
        r"(?i)(?:^|-)((?:{})-[0-9]+)(?:-|$)",
        alternatives.join("|")
    );
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            debug!(error = %e, "ticket pattern did not compile");
            None
        }
    }
}
