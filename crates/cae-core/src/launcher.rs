//! Assistant CLI discovery and launch.
//!
//! The assistant is looked up on `PATH` first, then in a few well-known
//! install locations. Launching is a convenience: when nothing is found the
//! caller gets [`LaunchOutcome::NotFound`] and the run still succeeds.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tracing::warn;

use crate::obs;

/// Default assistant executable name.
pub const ASSISTANT_BINARY: &str = "claude";

/// Result of [`Launcher::launch`].
#[derive(Debug)]
pub enum LaunchOutcome {
    /// The assistant ran and exited with `status`.
    Exited { binary: PathBuf, status: ExitStatus },
    /// No candidate executable exists or none could be started.
    NotFound,
}

#[derive(Debug, Clone)]
pub struct Launcher {
    binary: String,
    search_path: Option<OsString>,
    locations: Vec<PathBuf>,
}

impl Default for Launcher {
    fn default() -> Self {
        Self::new(ASSISTANT_BINARY)
    }
}

impl Launcher {
    /// Look for `binary` on `PATH` and in the standard install locations.
    pub fn new(binary: &str) -> Self {
        Launcher {
            binary: binary.to_string(),
            search_path: None,
            locations: default_locations(binary),
        }
    }

    /// Replace `PATH` with an explicit search path.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Replace the fallback install locations.
    pub fn with_locations(mut self, locations: Vec<PathBuf>) -> Self {
        self.locations = locations;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Executables to try, in order: search path, then install locations.
    ///
    /// Install locations that exist but are not executable are skipped.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let on_path = match &self.search_path {
            Some(paths) => which::which_in(&self.binary, Some(paths), "/"),
            None => which::which(&self.binary),
        };
        let mut candidates: Vec<PathBuf> = Vec::new();
        let found = self.locations.iter().filter_map(|location| executable_at(location));
        for path in on_path.into_iter().chain(found) {
            if !candidates.contains(&path) {
                candidates.push(path);
            }
        }
        candidates
    }

    /// First runnable candidate, if any.
    pub fn locate(&self) -> Option<PathBuf> {
        self.candidates().into_iter().next()
    }

    /// Run the assistant in `dir` with the terminal attached and wait for it.
    ///
    /// A candidate that fails to start is logged and the next one is tried.
    pub fn launch(&self, dir: &Path) -> LaunchOutcome {
        for binary in self.candidates() {
            obs::emit_assistant_launched(&binary, dir);
            match Command::new(&binary).current_dir(dir).status() {
                Ok(status) => return LaunchOutcome::Exited { binary, status },
                Err(e) => {
                    warn!(binary = %binary.display(), error = %e, "failed to start assistant");
                }
            }
        }

        warn!(
            binary = %self.binary,
            "assistant CLI not found; run it manually in {}",
            dir.display()
        );
        LaunchOutcome::NotFound
    }
}

fn executable_at(location: &Path) -> Option<PathBuf> {
    let name = location.file_name()?;
    let parent = location.parent()?;
    which::which_in(name, Some(parent), "/").ok()
}

/// Well-known install locations checked after `PATH`.
pub fn default_locations(binary: &str) -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(home) = dirs::home_dir() {
        locations.push(home.join(".claude").join("local").join(binary));
    }
    locations.push(PathBuf::from("/usr/local/bin").join(binary));
    locations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_locations() {
        let locations = default_locations("claude");
        assert_eq!(
            locations.last().unwrap(),
            &PathBuf::from("/usr/local/bin/claude")
        );
        if let Some(home) = dirs::home_dir() {
            assert_eq!(locations[0], home.join(".claude/local/claude"));
        }
    }

    #[test]
    fn test_not_found_is_not_an_error() {
        let empty = tempfile::tempdir().unwrap();
        let launcher = Launcher::new("cae-missing-assistant")
            .with_search_path(empty.path())
            .with_locations(vec![empty.path().join("nope")]);

        assert_eq!(launcher.locate(), None);
        let outcome = launcher.launch(empty.path());
        assert!(matches!(outcome, LaunchOutcome::NotFound));
    }

    #[cfg(unix)]
    fn write_script(path: &Path, body: &str, mode: u32) {
        use std::os::unix::fs::PermissionsExt;

        std::fs::write(path, body).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_locate_falls_back_to_install_location() {
        let dir = tempfile::tempdir().unwrap();
        let installed = dir.path().join("assistant");
        write_script(&installed, "#!/bin/sh\nexit 0\n", 0o755);

        let launcher = Launcher::new("cae-missing-assistant")
            .with_search_path(dir.path().join("empty-bin"))
            .with_locations(vec![dir.path().join("absent"), installed.clone()]);
        assert_eq!(launcher.locate(), Some(installed));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_install_location_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let installed = dir.path().join("claude");
        write_script(&installed, "#!/bin/sh\nexit 0\n", 0o644);

        let launcher = Launcher::new("cae-missing-assistant")
            .with_search_path(dir.path().join("empty-bin"))
            .with_locations(vec![installed]);

        assert_eq!(launcher.locate(), None);
        assert!(matches!(
            launcher.launch(dir.path()),
            LaunchOutcome::NotFound
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_candidate_that_fails_to_start_is_skipped() {
        let bin = tempfile::tempdir().unwrap();
        write_script(
            &bin.path().join("assistant"),
            "#!/cae/no/such/interpreter\n",
            0o755,
        );
        let fallback = ["/usr/bin/true", "/bin/true"]
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_file())
            .unwrap();

        let launcher = Launcher::new("assistant")
            .with_search_path(bin.path())
            .with_locations(vec![fallback]);
        assert_eq!(launcher.candidates().len(), 2);

        match launcher.launch(bin.path()) {
            LaunchOutcome::Exited { binary, status } => {
                assert!(binary.ends_with("true"));
                assert!(status.success());
            }
            LaunchOutcome::NotFound => panic!("fallback should have been launched"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_locate_prefers_search_path() {
        let bin = tempfile::tempdir().unwrap();
        let exe = bin.path().join("assistant");
        write_script(&exe, "#!/bin/sh\nexit 0\n", 0o755);

        let other = bin.path().join("other");
        write_script(&other, "#!/bin/sh\nexit 0\n", 0o755);

        let launcher = Launcher::new("assistant")
            .with_search_path(bin.path())
            .with_locations(vec![other]);
        assert_eq!(launcher.locate(), Some(exe));
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_waits_for_exit() {
        let workspace = tempfile::tempdir().unwrap();
        let launcher = Launcher::new("true")
            .with_search_path("/usr/bin:/bin")
            .with_locations(vec![]);

        match launcher.launch(workspace.path()) {
            LaunchOutcome::Exited { binary, status } => {
                assert!(binary.ends_with("true"));
                assert!(status.success());
            }
            LaunchOutcome::NotFound => panic!("`true` should be on /usr/bin:/bin"),
        }
    }
}
