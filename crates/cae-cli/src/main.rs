//! `cae` - check out one branch across several repositories and start the
//! assistant inside the resulting workspace.
//!
//! ```text
//! cae eng-346-implement-feature ios backend
//! cae feature/new-feature frontend backend docs
//! ```
//!
//! Repositories are organised in `./<branch-name-with-hyphens>/`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cae_core::{
    check_for_update, prepare_workspace, Config, LaunchOutcome, Launcher, PrepareOptions,
    PreparedWorkspace, SystemRunner, Workspace, ASSISTANT_BINARY, CONFIG_FILE_NAME,
};
use clap::Parser;
use tracing::{debug, Level};

const RULE: &str = "--------------------------------------------------";

#[derive(Parser, Debug)]
#[command(name = "cae")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Check out a branch across multiple repositories and launch the assistant")]
#[command(after_help = "Examples:\n  cae eng-346-implement-feature ios backend\n  \
                        cae feature/new-feature frontend backend docs\n\n\
                        Repositories are organised in ./<branch-name-with-hyphens>/")]
struct Cli {
    /// Branch name to check out or create
    branch: String,

    /// Repository names from the configuration file
    #[arg(required = true)]
    repos: Vec<String>,

    /// Configuration file
    #[arg(long, env = "CAE_CONFIG", default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Template for the context document (default: ./claude_template.md, then built-in)
    #[arg(long, env = "CAE_TEMPLATE")]
    template: Option<PathBuf>,

    /// Directory the workspace is created in (default: current directory)
    #[arg(long, env = "CAE_ROOT")]
    root: Option<PathBuf>,

    /// Assistant executable to launch in the workspace
    #[arg(long, env = "CAE_ASSISTANT", default_value = ASSISTANT_BINARY)]
    assistant: String,

    /// Prepare the workspace without launching the assistant
    #[arg(long)]
    no_launch: bool,

    /// Skip the check for a newer release
    #[arg(
        long,
        env = "CAE_NO_UPDATE_CHECK",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    no_update_check: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    cae_core::init_tracing(cli.json, level);

    if !cli.no_update_check {
        print_update_notice().await;
    }

    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let config = Config::load(&cli.config).context("Failed to load configuration")?;

    cmd_run(&cli, &config, &cwd)
}

/// Prepare the workspace, then hand the terminal to the assistant.
fn cmd_run(cli: &Cli, config: &Config, cwd: &Path) -> Result<()> {
    let root = cli.root.clone().unwrap_or_else(|| cwd.to_path_buf());
    let options = PrepareOptions {
        root,
        template: cli.template.clone(),
        template_dir: cwd.to_path_buf(),
    };

    let target = Workspace::locate(&options.root, &cli.branch)?;
    match config.github_org() {
        Some(org) => println!("Starting multi-repo checkout for {org}"),
        None => println!("Starting multi-repo checkout"),
    }
    println!("Branch: {}", cli.branch);
    println!("Directory: {}", target.display());
    println!("Repositories: {}", cli.repos.join(", "));
    println!("{RULE}");

    let prepared = prepare_workspace(config, &SystemRunner, &cli.branch, &cli.repos, &options)
        .with_context(|| format!("Failed to prepare workspace for branch '{}'", cli.branch))?;

    print_summary(&prepared);

    if cli.no_launch {
        println!("\nWorkspace ready in {}", prepared.workspace.dir().display());
        return Ok(());
    }

    let launcher = Launcher::new(&cli.assistant);
    let dir = prepared.workspace.dir();
    println!("\nLaunching {} in {}...", launcher.binary(), dir.display());
    match launcher.launch(dir) {
        LaunchOutcome::Exited { binary, status } => {
            debug!(binary = %binary.display(), %status, "assistant exited");
        }
        LaunchOutcome::NotFound => {
            println!(
                "Assistant CLI '{}' not found. Please run it manually.",
                launcher.binary()
            );
            println!("Workspace: {}", dir.display());
        }
    }

    Ok(())
}

fn print_summary(prepared: &PreparedWorkspace) {
    for report in &prepared.reports {
        let origin = if report.cloned { "cloned" } else { "updated" };
        println!(
            "✓ {} ({origin}, {} branch)",
            report.repo, report.branch_state
        );
        for warning in &report.warnings {
            println!("  ⚠ {warning}");
        }
    }
    println!("{RULE}");
    println!(
        "Set up {} repositories on '{}'",
        prepared.reports.len(),
        prepared.task.branch_name
    );
    if let Some(ticket) = prepared.task.ticket_id() {
        println!("Ticket: {ticket}");
    }
    println!("Context: {}", prepared.context_path.display());
}

async fn print_update_notice() {
    let Some(info) = check_for_update().await else {
        return;
    };
    if info.update_available() {
        println!("A new version of cae is available!");
        println!("   Current version: {}", info.current);
        println!("   Latest version: {}", info.latest);
        println!("   Update from: {}", cae_core::update::RELEASES_PAGE);
        println!("{RULE}");
    }
}
