//! `drafter init [--git]`

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use drafter_core::config::{self, ConfigWrite};
use drafter_core::paths;
use drafter_vcs::Git;

const GITIGNORE: &str = ".gitignore";

/// Write a default .drafter.yml and ignore the .drafter/ state directory.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Run `git init` first when the directory is not a repository yet.
    #[arg(long)]
    pub git: bool,
}

impl InitArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        if self.git {
            let git = Git::new(root);
            if !git.is_repository() {
                git.init()
                    .with_context(|| format!("git init failed in '{}'", root.display()))?;
                println!("✓ Initialized git repository");
            }
        }

        match config::write_default(root).context("failed to write default configuration")? {
            ConfigWrite::Created { path } => println!("✓ Wrote {}", path.display()),
            ConfigWrite::AlreadyExists { path } | ConfigWrite::Updated { path } => {
                println!("  {} already exists, left unchanged", path.display())
            }
        }

        if ensure_ignored(root)? {
            println!("✓ Added {}/ to {GITIGNORE}", paths::STATE_DIR);
        }
        Ok(())
    }
}

/// Append the state directory to `.gitignore` unless an entry already covers it.
fn ensure_ignored(root: &Path) -> Result<bool> {
    let path = root.join(GITIGNORE);
    let existing = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => Err(err).with_context(|| format!("failed to read '{}'", path.display()))?,
    };

    let covered = existing.lines().map(str::trim).any(|line| {
        let line = line.trim_start_matches('/').trim_end_matches('/');
        line == paths::STATE_DIR
    });
    if covered {
        return Ok(false);
    }

    let mut text = existing;
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(paths::STATE_DIR);
    text.push_str("/\n");
    fs::write(&path, text).with_context(|| format!("failed to write '{}'", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn appends_state_dir_once() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(GITIGNORE), "target").unwrap();

        assert!(ensure_ignored(dir.path()).unwrap());
        assert!(!ensure_ignored(dir.path()).unwrap());
        assert_eq!(
            fs::read_to_string(dir.path().join(GITIGNORE)).unwrap(),
            "target\n.drafter/\n"
        );
    }

    #[test]
    fn existing_rooted_entry_counts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(GITIGNORE), "/.drafter\n").unwrap();
        assert!(!ensure_ignored(dir.path()).unwrap());
    }
}
