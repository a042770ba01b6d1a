//! `git` subprocess adapter.
//!
//! Cycles stage and commit group by group, so the wrapper stays small and
//! explicit: one method per git invocation, stderr surfaced on failure.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, instrument};

use drafter_core::DiffStat;

use crate::{Vcs, VcsError};

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// `git init` in the working directory.
    pub fn init(&self) -> Result<(), VcsError> {
        self.run_checked(&["init", "-q"])?;
        Ok(())
    }

    /// True when the working directory is inside a git worktree.
    pub fn is_repository(&self) -> bool {
        self.run(&["rev-parse", "--is-inside-work-tree"])
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    fn has_head(&self) -> Result<bool, VcsError> {
        let out = self.run(&["rev-parse", "--verify", "-q", "HEAD"])?;
        Ok(out.status.success())
    }

    fn run_capture(&self, args: &[&str]) -> Result<String, VcsError> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output, VcsError> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VcsError::CommandFailed {
                command: args.join(" "),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output, VcsError> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|source| VcsError::Spawn {
                command: args.join(" "),
                source,
            })
    }
}

impl Vcs for Git {
    #[instrument(skip_all)]
    fn changed_files(&self) -> Result<Vec<String>, VcsError> {
        let out = self.run_capture(&["status", "--porcelain=v1", "-z", "-uall"])?;
        let files = parse_porcelain_z(&out)?;
        debug!(count = files.len(), "changed files");
        Ok(files)
    }

    fn diff(&self, staged: bool, paths: &[String]) -> Result<String, VcsError> {
        let mut args = vec!["diff"];
        if staged {
            args.push("--cached");
        }
        if !paths.is_empty() {
            args.push("--");
            args.extend(paths.iter().map(String::as_str));
        }
        self.run_capture(&args)
    }

    fn diff_stat(&self) -> Result<DiffStat, VcsError> {
        let out = self.run_capture(&["diff", "--numstat"])?;
        Ok(parse_numstat(&out))
    }

    fn current_branch(&self) -> Result<String, VcsError> {
        // symbolic-ref works on an unborn branch; it fails only when detached.
        let out = self.run(&["symbolic-ref", "--short", "-q", "HEAD"])?;
        if out.status.success() {
            return Ok(String::from_utf8_lossy(&out.stdout).trim().to_string());
        }
        Ok("HEAD".to_string())
    }

    #[instrument(skip_all, fields(count = paths.len()))]
    fn stage(&self, paths: &[String]) -> Result<(), VcsError> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add", "-A", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run_checked(&args)?;
        Ok(())
    }

    fn reset_index(&self) -> Result<(), VcsError> {
        if self.has_head()? {
            self.run_checked(&["reset", "-q"])?;
        } else {
            self.run_checked(&["rm", "-r", "-q", "--cached", "--ignore-unmatch", "."])?;
        }
        Ok(())
    }

    #[instrument(skip_all)]
    fn commit(&self, message: &str) -> Result<(), VcsError> {
        debug!(subject = message.lines().next().unwrap_or_default(), "committing");
        self.run_checked(&["commit", "-q", "-m", message])?;
        Ok(())
    }

    fn tag(&self, name: &str, message: &str) -> Result<(), VcsError> {
        self.run_checked(&["tag", "-a", name, "-m", message])?;
        Ok(())
    }

    #[instrument(skip_all, fields(remote, refspec, set_upstream))]
    fn push(&self, remote: &str, refspec: &str, set_upstream: bool) -> Result<(), VcsError> {
        let mut args = vec!["push"];
        if set_upstream {
            args.push("-u");
        }
        args.extend([remote, refspec]);
        self.run_checked(&args)?;
        Ok(())
    }
}

/// Parse `git status --porcelain=v1 -z` output. Renames and copies yield both paths.
fn parse_porcelain_z(out: &str) -> Result<Vec<String>, VcsError> {
    let mut files: Vec<String> = Vec::new();
    let mut tokens = out.split('\0').filter(|t| !t.is_empty());

    while let Some(entry) = tokens.next() {
        if entry.len() < 4 || !entry.is_char_boundary(3) {
            return Err(VcsError::Parse(format!("porcelain entry '{entry}'")));
        }
        let code = &entry[..2];
        push_unique(&mut files, &entry[3..]);
        if code.contains('R') || code.contains('C') {
            let origin = tokens
                .next()
                .ok_or_else(|| VcsError::Parse(format!("rename without origin: '{entry}'")))?;
            push_unique(&mut files, origin);
        }
    }
    Ok(files)
}

fn push_unique(files: &mut Vec<String>, path: &str) {
    if !files.iter().any(|f| f == path) {
        files.push(path.to_string());
    }
}

/// Sum `git diff --numstat`; binary entries (`-`) count as zero.
fn parse_numstat(out: &str) -> DiffStat {
    let mut stat = DiffStat::default();
    for line in out.lines() {
        let mut cols = line.split('\t');
        let (Some(added), Some(removed)) = (cols.next(), cols.next()) else {
            continue;
        };
        stat.insertions += added.parse::<u64>().unwrap_or(0);
        stat.deletions += removed.parse::<u64>().unwrap_or(0);
    }
    stat
}
