//! `submoduler` command-line entry point.
//!
//! ## Commands
//!
//! - `status`: show working-tree changes in every repository
//! - `test`: run the test command in the parent and its children
//! - `push`: push children, vendors and then the parent
//! - `update`: recursively update children, then commit and push the parent
//! - `sync_version`: raise every child to the highest declared version
//! - `add_branch`: create a branch in every repository
//! - `symlink_build`: link shared steering documents into the root

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use submoduler::telemetry::{default_level, init_tracing};
use submoduler::{
    build_symlinks, BranchOptions, Console, Orchestrator, PushOptions, RunReport,
    SubmodulerConfig, SyncOptions, SystemRunner, TestOptions, UpdateOptions,
};

#[derive(Parser)]
#[command(name = "submoduler")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Manage a parent repository together with its submodules", long_about = None)]
struct Cli {
    /// Working root (default: current directory)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Show full command output and debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the run summary as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Kill any git or test command running longer than this
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the git status of all repositories
    Status,

    /// Run tests in the parent and child repositories
    Test {
        /// Only test the parent repository
        #[arg(long)]
        parent_only: bool,

        /// Only test child repositories
        #[arg(long)]
        children_only: bool,

        /// Only test the child with this name
        #[arg(long, value_name = "NAME")]
        submodule: Option<String>,
    },

    /// Push unpushed commits, parent last
    Push {
        /// Show what would be pushed without pushing
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Update children recursively, then commit and push the parent
    Update {
        /// Commit message for the parent
        #[arg(short, long)]
        message: Option<String>,

        /// Tag and push v<version> after the parent is pushed
        #[arg(long)]
        release: bool,

        /// Only update the child with this name or path
        #[arg(long, value_name = "SUBMODULE")]
        only: Option<String>,

        /// Update children only
        #[arg(long)]
        skip_parent: bool,

        /// Show what would be committed without changing anything
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Sync all child versions to the highest one found
    #[command(name = "sync_version", alias = "sync-version")]
    SyncVersion {
        /// Show the plan without rewriting or committing
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Create a branch in every repository
    #[command(name = "add_branch", alias = "add-branch")]
    AddBranch {
        /// Branch name
        name: Option<String>,

        /// Check the branch out after creating it
        #[arg(short, long)]
        checkout: bool,

        /// Show what would be created without creating it
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Link steering documents from the vendored gems into .kiro/steering
    #[command(name = "symlink_build", alias = "symlink-build")]
    SymlinkBuild,

    /// Generate a report (not yet implemented)
    Report,

    /// Cut a release (not yet implemented)
    Release,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json, default_level(cli.verbose));

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let mut config = SubmodulerConfig::load(&root)?;
    if let Some(secs) = cli.timeout {
        config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    tracing::debug!(root = %root.display(), ?config, "loaded configuration");

    let json = cli.json;
    let vendor_dir = config.vendor_dir.clone();
    let orchestrator = || -> Result<Orchestrator<SystemRunner>> {
        let runner = SystemRunner::new(config.timeout).context("Failed to start command runner")?;
        Ok(Orchestrator::new(&root, config, runner)
            .with_console(Console::new(!json, cli.verbose)))
    };

    let report = match cli.command {
        Commands::Status => orchestrator()?.status()?,
        Commands::Test {
            parent_only,
            children_only,
            submodule,
        } => orchestrator()?.test(&TestOptions {
            parent_only,
            children_only,
            submodule,
        })?,
        Commands::Push { dry_run } => orchestrator()?.push(&PushOptions { dry_run })?,
        Commands::Update {
            message,
            release,
            only,
            skip_parent,
            dry_run,
        } => orchestrator()?.update(&UpdateOptions {
            message,
            only,
            skip_parent,
            release,
            dry_run,
        })?,
        Commands::SyncVersion { dry_run } => {
            orchestrator()?.sync_version(&SyncOptions { dry_run })?
        }
        Commands::AddBranch {
            name,
            checkout,
            dry_run,
        } => orchestrator()?.add_branch(&BranchOptions {
            name: name.unwrap_or_default(),
            checkout,
            dry_run,
        })?,
        Commands::SymlinkBuild => {
            let report = build_symlinks(&root, &vendor_dir)
                .context("Failed to build steering symlinks")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report.print();
            }
            return Ok(0);
        }
        Commands::Report => return not_implemented("report"),
        Commands::Release => return not_implemented("release"),
    };

    emit(&report, json)?;
    Ok(report.exit_code())
}

fn emit(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialize report")?
        );
    } else {
        report.print_terminal();
    }
    Ok(())
}

fn not_implemented(command: &str) -> Result<u8> {
    println!("{}: not yet implemented", command);
    Ok(0)
}
