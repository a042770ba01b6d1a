//! Read-only views over the audit log: `status`, `timeline`, `show`, `commits`.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use drafter_audit::{log, AuditEntry};
use drafter_core::paths;
use drafter_cycle::CycleRecord;

use super::{resolve_cycle, status_label};

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

/// Show the most recent cycle.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit the entry as JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let path = paths::audit_log_path(root);
        let latest: Option<AuditEntry<CycleRecord>> = log::latest(&path)
            .with_context(|| format!("failed to read audit log '{}'", path.display()))?;

        let Some(entry) = latest else {
            if self.json {
                println!("{}", serde_json::json!({ "status": "idle" }));
            } else {
                println!("No cycles recorded yet.");
            }
            return Ok(());
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&entry).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        let record = &entry.record;
        println!(
            "{}  {}  ({})",
            status_label(record.status),
            record.message,
            format_age(&entry.timestamp)
        );
        println!("  When:    {}", entry.timestamp);
        if !record.branch.is_empty() {
            println!("  Branch:  {}", record.branch);
        }
        if let Some(tag) = &record.tag {
            println!("  Tag:     {tag}");
        }
        println!(
            "  Commits: {}  Pushed: {}",
            record.commits.len(),
            if record.pushed { "yes" } else { "no" }
        );
        for error in &record.errors {
            println!("  {} {}", "✗".red(), error);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// timeline
// ---------------------------------------------------------------------------

/// List recent cycles.
#[derive(Args, Debug)]
pub struct TimelineArgs {
    /// How many cycles to show, newest first.
    #[arg(long, short = 'n', default_value_t = 10)]
    pub limit: usize,
}

#[derive(Tabled)]
struct TimelineRow {
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Age")]
    age: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Commits")]
    commits: usize,
    #[tabled(rename = "Pushed")]
    pushed: String,
    #[tabled(rename = "Tag")]
    tag: String,
}

impl TimelineArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let path = paths::audit_log_path(root);
        let entries: Vec<AuditEntry<CycleRecord>> = log::entries(&path)
            .with_context(|| format!("failed to read audit log '{}'", path.display()))?;

        if entries.is_empty() {
            println!("No cycles recorded yet.");
            return Ok(());
        }

        let total = entries.len();
        let rows: Vec<TimelineRow> = entries
            .into_iter()
            .rev()
            .take(self.limit)
            .map(|entry| TimelineRow {
                age: format_age(&entry.timestamp),
                when: entry.timestamp,
                status: entry.record.status.to_string(),
                commits: entry.record.commits.len(),
                pushed: if entry.record.pushed { "yes" } else { "-" }.to_string(),
                tag: entry.record.tag.unwrap_or_else(|| "-".to_string()),
            })
            .collect();

        let shown = rows.len();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        if shown < total {
            println!("{}", format!("{shown} of {total} cycles").bright_black());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// show / commits
// ---------------------------------------------------------------------------

/// Print one cycle's audit entry as JSON.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Cycle tag, timestamp, or `latest`.
    pub cycle: String,
}

impl ShowArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let entry = resolve_cycle(root, &self.cycle)?;
        println!(
            "{}",
            serde_json::to_string_pretty(&entry).context("failed to serialize cycle JSON")?
        );
        Ok(())
    }
}

/// List the commits a cycle made.
#[derive(Args, Debug)]
pub struct CommitsArgs {
    /// Cycle tag, timestamp, or `latest`.
    pub cycle: String,
}

impl CommitsArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let entry = resolve_cycle(root, &self.cycle)?;
        if entry.record.commits.is_empty() {
            println!("No commits in this cycle.");
            return Ok(());
        }
        for subject in &entry.record.commits {
            println!("{subject}");
        }
        Ok(())
    }
}

/// "42s ago", "3m ago"; the raw value when it does not parse.
fn format_age(timestamp: &str) -> String {
    let Ok(at) = DateTime::parse_from_rfc3339(timestamp) else {
        return timestamp.to_string();
    };
    let seconds = Utc::now()
        .signed_duration_since(at.with_timezone(&Utc))
        .num_seconds()
        .max(0);
    let age = match seconds {
        s if s < 60 => format!("{s}s"),
        s if s < 60 * 60 => format!("{}m", s / 60),
        s if s < 60 * 60 * 24 => format!("{}h", s / (60 * 60)),
        s => format!("{}d", s / (60 * 60 * 24)),
    };
    format!("{age} ago")
}
