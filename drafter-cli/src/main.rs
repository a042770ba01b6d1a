//! drafter: turn a dirty working tree into grouped commits.
//!
//! # Usage
//!
//! ```text
//! drafter init [--git]
//! drafter on [--status-port <port>]
//! drafter plan | commit | push [--yes]
//! drafter status [--json]
//! drafter timeline [--limit <n>]
//! drafter show <cycle>
//! drafter commits <cycle>
//! drafter undo <cycle> [--dry-run] [--yes]
//! drafter restore <file> --at <cycle> [--dry-run] [--yes]
//! drafter config [--json]
//! drafter switch <plan|commit|push>
//! ```
//!
//! `<cycle>` is a cycle tag, an audit timestamp, or `latest`.

mod commands;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{
    config::{ConfigArgs, SwitchArgs},
    cycle::{CommitArgs, PlanArgs, PushArgs},
    history::{CommitsArgs, ShowArgs, StatusArgs, TimelineArgs},
    init::InitArgs,
    on::OnArgs,
    restore::{RestoreArgs, UndoArgs},
};
use drafter_core::{config, paths};
use drafter_daemon::logging;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "drafter",
    version,
    about = "Group working-tree changes into commits and push them while you work",
    long_about = None,
)]
struct Cli {
    /// Repository to operate on.
    #[arg(long, global = true, default_value = ".", value_name = "PATH")]
    repo: PathBuf,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default .drafter.yml and ignore the .drafter/ state directory.
    Init(InitArgs),

    /// Watch the repository and run cycles until Ctrl-C.
    On(OnArgs),

    /// Show how pending changes would be grouped, without committing.
    Plan(PlanArgs),

    /// Commit pending changes in groups.
    Commit(CommitArgs),

    /// Commit pending changes and push them to the target branch.
    Push(PushArgs),

    /// Show the most recent cycle.
    Status(StatusArgs),

    /// List recent cycles.
    Timeline(TimelineArgs),

    /// Print one cycle's audit entry as JSON.
    Show(ShowArgs),

    /// List the commits a cycle made.
    Commits(CommitsArgs),

    /// Put every file a cycle touched back to its pre-cycle content.
    Undo(UndoArgs),

    /// Put one file back to its content before a cycle.
    Restore(RestoreArgs),

    /// Print the effective configuration.
    Config(ConfigArgs),

    /// Persist a new default mode in .drafter.yml.
    Switch(SwitchArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = commands::resolve_root(&cli.repo)?;
    init_logging(&root, cli.verbose, cli.quiet);

    match cli.command {
        Commands::Init(args) => args.run(&root),
        Commands::On(args) => args.run(&root),
        Commands::Plan(args) => args.run(&root),
        Commands::Commit(args) => args.run(&root),
        Commands::Push(args) => args.run(&root),
        Commands::Status(args) => args.run(&root),
        Commands::Timeline(args) => args.run(&root),
        Commands::Show(args) => args.run(&root),
        Commands::Commits(args) => args.run(&root),
        Commands::Undo(args) => args.run(&root),
        Commands::Restore(args) => args.run(&root),
        Commands::Config(args) => args.run(&root),
        Commands::Switch(args) => args.run(&root),
    }
}

/// Logging is set up before the command runs, so an unreadable config falls
/// back to defaults here and is reported by the command itself.
fn init_logging(root: &Path, verbose: u8, quiet: bool) {
    let config = config::load(root).unwrap_or_default();
    let level = logging::effective_level(&config.log_level, verbose, quiet);
    let log_file = config.log_to_file.then(|| paths::log_path(root));
    logging::init(&level, log_file.as_deref());
}
