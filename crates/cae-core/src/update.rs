//! Release check against the GitHub releases API.
//!
//! Every failure (network, timeout, bad JSON, unparsable version) is
//! swallowed: the check must never delay or break a run.

use std::time::Duration;

use semver::Version;
use serde::Deserialize;
use tracing::debug;

/// Latest-release endpoint for this tool.
pub const RELEASES_URL: &str =
    "https://api.github.com/repos/kgn/claude_agent_environment/releases/latest";

/// Where users can download a newer release.
pub const RELEASES_PAGE: &str = "https://github.com/kgn/claude_agent_environment/releases/latest";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Current and latest released versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub current: Version,
    pub latest: Version,
}

impl UpdateInfo {
    pub fn update_available(&self) -> bool {
        self.latest > self.current
    }
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    #[serde(default)]
    tag_name: String,
}

/// Parse a release tag such as `v1.2.0` or `1.2`.
///
/// Missing minor/patch components are treated as zero.
pub fn parse_release_tag(tag: &str) -> Option<Version> {
    let trimmed = tag.trim().trim_start_matches('v');
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }
    let padded = match trimmed.matches('.').count() {
        0 => format!("{trimmed}.0.0"),
        1 => format!("{trimmed}.0"),
        _ => return None,
    };
    Version::parse(&padded).ok()
}

/// Compare `current` with the tag of the latest release.
pub fn compare_versions(current: &str, latest_tag: &str) -> Option<UpdateInfo> {
    Some(UpdateInfo {
        current: parse_release_tag(current)?,
        latest: parse_release_tag(latest_tag)?,
    })
}

/// Queries the releases endpoint.
pub struct UpdateChecker {
    url: String,
    http_client: reqwest::Client,
}

impl UpdateChecker {
    pub fn new(url: impl Into<String>) -> Option<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("cae/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .ok()?;
        Some(UpdateChecker {
            url: url.into(),
            http_client,
        })
    }

    /// Tag of the latest release, or `None` on any failure.
    pub async fn latest_tag(&self) -> Option<String> {
        let response = match self.http_client.get(&self.url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(status = %r.status(), "release check returned an error status");
                return None;
            }
            Err(e) => {
                debug!(error = %e, "release check failed");
                return None;
            }
        };
        let release: LatestRelease = response.json().await.ok()?;
        Some(release.tag_name).filter(|tag| !tag.is_empty())
    }

    /// Compare the running version against the latest release.
    pub async fn check(&self, current: &str) -> Option<UpdateInfo> {
        let tag = self.latest_tag().await?;
        compare_versions(current, &tag)
    }
}

/// Check the default endpoint for a newer release of this crate.
pub async fn check_for_update() -> Option<UpdateInfo> {
    UpdateChecker::new(RELEASES_URL)?
        .check(env!("CARGO_PKG_VERSION"))
        .await
}
