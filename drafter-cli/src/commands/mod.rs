pub mod config;
pub mod cycle;
pub mod history;
pub mod init;
pub mod on;
pub mod restore;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::{ColoredString, Colorize};

use drafter_audit::{log, AuditEntry};
use drafter_core::{config as core_config, paths, DrafterConfig};
use drafter_cycle::{CycleRecord, CycleStatus};

/// Identifiers that resolve to the newest audit entry.
const LATEST_ALIASES: &[&str] = &["latest", "last"];

pub fn resolve_root(repo: &Path) -> Result<PathBuf> {
    repo.canonicalize()
        .with_context(|| format!("cannot resolve repository path '{}'", repo.display()))
}

pub fn load_config(root: &Path) -> Result<DrafterConfig> {
    core_config::load(root)
        .with_context(|| format!("failed to load configuration for '{}'", root.display()))
}

/// Look up a cycle by tag, timestamp or `latest`.
pub fn resolve_cycle(root: &Path, id: &str) -> Result<AuditEntry<CycleRecord>> {
    let path = paths::audit_log_path(root);
    let entry = if LATEST_ALIASES.contains(&id) {
        log::latest(&path)
    } else {
        log::find(&path, id)
    }
    .with_context(|| format!("failed to read audit log '{}'", path.display()))?;

    match entry {
        Some(entry) => Ok(entry),
        None if LATEST_ALIASES.contains(&id) => bail!("no cycles recorded yet"),
        None => bail!("no cycle matches '{id}'"),
    }
}

/// Ask a yes/no question on stdin. Anything but `y`/`yes` is a no.
pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush().context("failed to flush stdout")?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

pub fn status_label(status: CycleStatus) -> ColoredString {
    let label = status.as_str().to_uppercase();
    match status {
        CycleStatus::Pushed | CycleStatus::Committed => label.green().bold(),
        CycleStatus::CommitOnly => label.yellow().bold(),
        CycleStatus::Blocked => label.red().bold(),
        CycleStatus::Planned => label.cyan().bold(),
        CycleStatus::NoChanges => label.bright_black().bold(),
    }
}
