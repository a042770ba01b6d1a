//! `drafter undo <cycle>` and `drafter restore <file> --at <cycle>`

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use similar::TextDiff;

use drafter_audit::snapshot::{self, RestoreOutcome, RestoredFile};
use drafter_audit::SnapshotEntry;

use super::{confirm, resolve_cycle};

/// Put every file a cycle touched back to its pre-cycle content.
#[derive(Args, Debug)]
pub struct UndoArgs {
    /// Cycle tag, timestamp, or `latest`.
    pub cycle: String,

    /// Report what would change without touching the worktree.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl UndoArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let entry = resolve_cycle(root, &self.cycle)?;
        let snapshot = entry.record.snapshot;
        if snapshot.is_empty() {
            println!("Cycle {} has no snapshot to restore.", self.cycle);
            return Ok(());
        }

        if !self.dry_run
            && !self.yes
            && !confirm(&format!(
                "Restore {} file(s) to their state before cycle {}?",
                snapshot.len(),
                self.cycle
            ))?
        {
            println!("Canceled.");
            return Ok(());
        }

        let results = snapshot::restore(root, &snapshot, None, self.dry_run);
        report(&results, self.dry_run)
    }
}

/// Put one file back to its content before a cycle.
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// File to restore, relative to the repository root.
    pub file: PathBuf,

    /// Cycle tag, timestamp, or `latest`.
    #[arg(long, value_name = "CYCLE")]
    pub at: String,

    /// Print a diff of what would change instead of writing.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl RestoreArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let file = relative_key(root, &self.file)?;
        let entry = resolve_cycle(root, &self.at)?;
        let Some(saved) = entry.record.snapshot.get(&file) else {
            bail!("'{file}' is not in the snapshot of cycle {}", self.at);
        };

        if self.dry_run {
            print_diff(root, &file, saved)?;
        } else if !self.yes
            && !confirm(&format!(
                "Overwrite {file} with its state before cycle {}?",
                self.at
            ))?
        {
            println!("Canceled.");
            return Ok(());
        }

        let targets = [file];
        let results = snapshot::restore(
            root,
            &entry.record.snapshot,
            Some(targets.as_slice()),
            self.dry_run,
        );
        report(&results, self.dry_run)
    }
}

/// Snapshot keys are repository-relative with `/` separators.
fn relative_key(root: &Path, file: &Path) -> Result<String> {
    let relative = if file.is_absolute() {
        file.strip_prefix(root)
            .with_context(|| format!("'{}' is outside '{}'", file.display(), root.display()))?
    } else {
        file
    };
    let key = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .filter(|part| part != ".")
        .collect::<Vec<_>>()
        .join("/");
    if key.is_empty() {
        bail!("'{}' does not name a file", file.display());
    }
    Ok(key)
}

fn print_diff(root: &Path, file: &str, saved: &SnapshotEntry) -> Result<()> {
    let restored = match saved {
        SnapshotEntry::Content(_) => match saved.content_bytes() {
            Some(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Some(Err(err)) => bail!("snapshot of '{file}' is not valid base64: {err}"),
            None => String::new(),
        },
        SnapshotEntry::Absent => String::new(),
        SnapshotEntry::TooLarge { .. } | SnapshotEntry::Error { .. } => {
            println!("No content saved for {file} ({saved}).");
            return Ok(());
        }
    };

    let path = root.join(file);
    let current = match fs::read(&path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => Err(err).with_context(|| format!("failed to read '{}'", path.display()))?,
    };

    if current == restored {
        println!("No differences for {file}.");
        return Ok(());
    }
    let diff = TextDiff::from_lines(&current, &restored)
        .unified_diff()
        .header(&format!("a/{file}"), &format!("b/{file}"))
        .context_radius(3)
        .to_string();
    print!("{diff}");
    Ok(())
}

fn report(results: &[RestoredFile], dry_run: bool) -> Result<()> {
    let mut failed = 0;
    for result in results {
        let (mark, text) = match &result.outcome {
            RestoreOutcome::Written => ("✓".green(), "restored".to_string()),
            RestoreOutcome::WouldWrite => ("~".cyan(), "would restore".to_string()),
            RestoreOutcome::Deleted => ("✓".green(), "deleted".to_string()),
            RestoreOutcome::WouldDelete => ("~".cyan(), "would delete".to_string()),
            RestoreOutcome::AlreadyAbsent => ("·".bright_black(), "already absent".to_string()),
            RestoreOutcome::SkippedTooLarge => {
                ("!".yellow(), "skipped, too large when captured".to_string())
            }
            RestoreOutcome::SkippedError => {
                ("!".yellow(), "skipped, unreadable when captured".to_string())
            }
            RestoreOutcome::NotInSnapshot => ("!".yellow(), "not in snapshot".to_string()),
            RestoreOutcome::Failed { reason } => {
                failed += 1;
                ("✗".red(), format!("failed: {reason}"))
            }
        };
        println!("  {mark} {}  {}", result.path, text.bright_black());
    }

    let acted = snapshot::restored_paths(results).len();
    if dry_run {
        println!("Would restore {acted} file(s).");
    } else {
        println!("✓ Restored {acted} file(s).");
    }
    if failed > 0 {
        bail!("{failed} file(s) could not be restored");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_relative_with_forward_slashes() {
        let root = Path::new("/repo");
        assert_eq!(relative_key(root, Path::new("./src/a.rs")).unwrap(), "src/a.rs");
        assert_eq!(relative_key(root, Path::new("/repo/docs/b.md")).unwrap(), "docs/b.md");
        assert!(relative_key(root, Path::new("/elsewhere/c.md")).is_err());
        assert!(relative_key(root, Path::new(".")).is_err());
    }
}
