//! End-to-end workspace preparation against real git repositories.
//!
//! Upstream repositories are local directories, so cloning and fetching
//! never leave the machine.

use std::path::Path;
use std::process::Command;

use cae_core::{
    current_branch, prepare_workspace, BranchState, CaeError, Config, PrepareOptions,
    SystemRunner, TEMPLATE_FILE_NAME,
};
use tempfile::TempDir;

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// A repository with one commit on `main`, usable as a clone URL.
fn make_upstream() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    run_git(dir.path(), &["init", "--initial-branch=main"]);
    run_git(dir.path(), &["config", "user.name", "test-user"]);
    run_git(dir.path(), &["config", "user.email", "test@example.com"]);
    run_git(dir.path(), &["config", "commit.gpgsign", "false"]);
    std::fs::write(dir.path().join("README.md"), "upstream\n").unwrap();
    run_git(dir.path(), &["add", "README.md"]);
    run_git(dir.path(), &["commit", "-m", "initial"]);
    dir
}

fn config_for(repos: &[(&str, &Path)], extra: &str) -> Config {
    let entries: Vec<String> = repos
        .iter()
        .map(|(name, path)| {
            format!(
                r#""{name}": {{"url": {}, "type": "test", "test": "make test"}}"#,
                serde_json::to_string(&path.display().to_string()).unwrap()
            )
        })
        .collect();
    Config::from_json(&format!(
        r#"{{"repositories": {{{}}}{extra}}}"#,
        entries.join(", ")
    ))
    .unwrap()
}

#[test]
fn prepares_workspace_for_frontend_and_backend() {
    let frontend = make_upstream();
    let backend = make_upstream();
    let root = tempfile::tempdir().unwrap();
    let config = config_for(
        &[("frontend", frontend.path()), ("backend", backend.path())],
        "",
    );

    let prepared = prepare_workspace(
        &config,
        &SystemRunner,
        "feature/x",
        &["frontend", "backend"],
        &PrepareOptions::in_dir(root.path()),
    )
    .unwrap();

    let ws_dir = root.path().join("feature-x");
    assert_eq!(prepared.workspace.dir(), ws_dir);
    assert!(ws_dir.join("frontend/README.md").is_file());
    assert!(ws_dir.join("backend/README.md").is_file());
    assert_eq!(prepared.context_path, ws_dir.join("CLAUDE.md"));

    let context = std::fs::read_to_string(&prepared.context_path).unwrap();
    assert!(context.contains("- **Branch Name**: `feature/x`"));
    assert!(context.contains("- **frontend**: "));
    assert!(context.contains("cd backend && make test"));
    assert!(!context.contains("Linear Ticket"));

    for report in &prepared.reports {
        assert!(report.cloned);
        assert_eq!(report.branch_state, BranchState::Created);
        assert_eq!(current_branch(&SystemRunner, &report.path).unwrap(), "feature/x");
    }
}

#[test]
fn second_run_fetches_instead_of_cloning() {
    let upstream = make_upstream();
    let root = tempfile::tempdir().unwrap();
    let config = config_for(&[("app", upstream.path())], "");
    let options = PrepareOptions::in_dir(root.path());

    prepare_workspace(&config, &SystemRunner, "eng-12-retry", &["app"], &options).unwrap();

    // An untracked file survives only if the checkout is reused.
    let marker = root.path().join("eng-12-retry/app/local-notes.txt");
    std::fs::write(&marker, "keep me").unwrap();

    let prepared =
        prepare_workspace(&config, &SystemRunner, "eng-12-retry", &["app"], &options).unwrap();

    let report = &prepared.reports[0];
    assert!(!report.cloned);
    assert_eq!(report.branch_state, BranchState::Existing);
    assert!(marker.is_file());
    assert_eq!(
        current_branch(&SystemRunner, &report.path).unwrap(),
        "eng-12-retry"
    );
}

#[test]
fn branch_existing_upstream_is_tracked() {
    let upstream = make_upstream();
    run_git(upstream.path(), &["branch", "ops-7-rotate"]);
    let root = tempfile::tempdir().unwrap();
    let config = config_for(
        &[("infra", upstream.path())],
        r#", "linear_base_url": "https://linear.app/acme/issue""#,
    );

    let prepared = prepare_workspace(
        &config,
        &SystemRunner,
        "ops-7-rotate",
        &["infra"],
        &PrepareOptions::in_dir(root.path()),
    )
    .unwrap();

    assert_eq!(prepared.reports[0].branch_state, BranchState::Tracked);
    assert_eq!(prepared.task.ticket_id(), Some("ops-7"));

    let context = std::fs::read_to_string(&prepared.context_path).unwrap();
    assert!(context.contains("- **Linear URL**: https://linear.app/acme/issue/ops-7"));
}

#[test]
fn branch_matching_only_the_tail_of_an_upstream_branch_is_created() {
    let upstream = make_upstream();
    run_git(upstream.path(), &["branch", "feature/x"]);
    let root = tempfile::tempdir().unwrap();
    let config = config_for(&[("app", upstream.path())], "");

    let prepared = prepare_workspace(
        &config,
        &SystemRunner,
        "x",
        &["app"],
        &PrepareOptions::in_dir(root.path()),
    )
    .unwrap();

    let report = &prepared.reports[0];
    assert_eq!(report.branch_state, BranchState::Created);
    assert_eq!(current_branch(&SystemRunner, &report.path).unwrap(), "x");
}

#[test]
fn unknown_repository_leaves_filesystem_untouched() {
    let upstream = make_upstream();
    let root = tempfile::tempdir().unwrap();
    let config = config_for(&[("app", upstream.path())], "");

    let err = prepare_workspace(
        &config,
        &SystemRunner,
        "feature/x",
        &["app", "ghost"],
        &PrepareOptions::in_dir(root.path()),
    )
    .unwrap_err();

    assert!(matches!(err, CaeError::UnknownRepository { ref name, .. } if name == "ghost"));
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn clone_failure_aborts_remaining_repositories() {
    let good = make_upstream();
    let root = tempfile::tempdir().unwrap();
    let missing = root.path().join("no-such-upstream");
    let config = config_for(&[("broken", missing.as_path()), ("good", good.path())], "");

    let err = prepare_workspace(
        &config,
        &SystemRunner,
        "feature/y",
        &["broken", "good"],
        &PrepareOptions::in_dir(root.path()),
    )
    .unwrap_err();

    match err {
        CaeError::RepositorySync { repo, command, .. } => {
            assert_eq!(repo, "broken");
            assert!(command.starts_with("git clone"));
        }
        CaeError::RepositoryNotFound { repo, .. } => assert_eq!(repo, "broken"),
        other => panic!("unexpected error: {other}"),
    }
    let ws_dir = root.path().join("feature-y");
    assert!(!ws_dir.join("good").exists());
    assert!(!ws_dir.join("CLAUDE.md").exists());
}

#[test]
fn custom_template_in_invocation_directory_is_used() {
    let upstream = make_upstream();
    let root = tempfile::tempdir().unwrap();
    std::fs::write(
        root.path().join(TEMPLATE_FILE_NAME),
        "branch={branch_name}\nrepos={repositories_list}\nowner={owner}\n",
    )
    .unwrap();
    let config = config_for(&[("app", upstream.path())], "");

    let prepared = prepare_workspace(
        &config,
        &SystemRunner,
        "feature/z",
        &["app"],
        &PrepareOptions::in_dir(root.path()),
    )
    .unwrap();

    let context = std::fs::read_to_string(&prepared.context_path).unwrap();
    assert!(context.starts_with("branch=feature/z\nrepos=- **app**: "));
    assert!(context.ends_with("owner={owner}\n"));
}

#[test]
fn missing_explicit_template_fails_before_workspace_exists() {
    let upstream = make_upstream();
    let root = tempfile::tempdir().unwrap();
    let config = config_for(&[("app", upstream.path())], "");
    let options = PrepareOptions {
        template: Some(root.path().join("missing.md")),
        ..PrepareOptions::in_dir(root.path())
    };

    let err =
        prepare_workspace(&config, &SystemRunner, "feature/t", &["app"], &options).unwrap_err();

    assert!(matches!(err, CaeError::Template { .. }));
    assert!(!root.path().join("feature-t").exists());
}
