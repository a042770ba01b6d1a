//! `drafter plan`, `drafter commit`, `drafter push [--yes]`

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use drafter_core::{Mode, Severity};
use drafter_cycle::{push_allowed, CycleEngine, CycleReport, CycleStatus};
use drafter_vcs::Git;

use super::{confirm, load_config, status_label};

/// Show how pending changes would be grouped, without committing.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Print the cycle record as JSON.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let mut engine = open_engine(root)?;
        let report = engine
            .execute(Mode::Plan)
            .context("plan cycle failed")?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report.record())
                    .context("failed to serialize cycle JSON")?
            );
        } else {
            print_report(&report);
        }
        finish(&report)
    }
}

/// Commit pending changes in groups.
#[derive(Args, Debug)]
pub struct CommitArgs {}

impl CommitArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let mut engine = open_engine(root)?;
        let report = engine
            .execute(Mode::Commit)
            .context("commit cycle failed")?;
        print_report(&report);
        finish(&report)
    }
}

/// Commit pending changes and push them to the target branch.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Push without asking.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl PushArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let mut engine = open_engine(root)?;
        let config = engine.config().clone();
        let ask = config.smart_push.ask && !self.yes;

        let decide = |report: &CycleReport| {
            if !push_allowed(&config, report) {
                return false;
            }
            if !ask {
                return true;
            }
            let prompt = format!(
                "Push {} commit(s) to {}/{}?",
                report.commits.len(),
                config.remote,
                report.branch
            );
            confirm(&prompt).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "could not read confirmation, not pushing");
                false
            })
        };

        let report = engine
            .execute_with(Mode::Push, &decide)
            .context("push cycle failed")?;
        print_report(&report);
        finish(&report)
    }
}

fn open_engine(root: &Path) -> Result<CycleEngine> {
    let config = load_config(root)?;
    if !Git::new(root).is_repository() {
        bail!(
            "'{}' is not a git repository (run `drafter init --git`)",
            root.display()
        );
    }
    Ok(drafter_cycle::open(root, config))
}

/// A blocked cycle is a failure for one-shot commands.
fn finish(report: &CycleReport) -> Result<()> {
    if report.status == CycleStatus::Blocked {
        bail!("cycle blocked by policy");
    }
    Ok(())
}

fn print_report(report: &CycleReport) {
    println!("{}  {}", status_label(report.status), report.message);
    if report.status == CycleStatus::NoChanges {
        return;
    }

    println!(
        "Branch: {}  Diff: {} {}",
        report.branch,
        format!("+{}", report.diff_stat.insertions).green(),
        format!("-{}", report.diff_stat.deletions).red(),
    );

    if !report.plan.groups.is_empty() {
        println!("Groups ({}):", report.plan.source);
        for (n, group) in report.plan.groups.iter().enumerate() {
            println!("  {}. {}", n + 1, group.title.bold());
            for file in &group.files {
                println!("     {}", file.bright_black());
            }
        }
    }

    for message in &report.policy.messages {
        match message.severity {
            Severity::Error => println!("  {} {}", "✗".red().bold(), message.message),
            Severity::Warning => println!("  {} {}", "!".yellow().bold(), message.message),
        }
    }

    for subject in &report.commits {
        println!("  {} {}", "✓".green(), subject);
    }
    if let Some(tag) = &report.tag {
        println!("Tag: {tag}");
    }
    for error in &report.errors {
        println!("  {} {}", "✗".red(), error);
    }
}
