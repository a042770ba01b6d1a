//! Version-control collaborator for drafter cycles.
//!
//! [`Vcs`] is the seam the cycle engine talks through; [`Git`] implements it
//! with `git` subprocess calls.

mod error;
pub mod git;

pub use error::VcsError;
pub use git::Git;

use drafter_core::DiffStat;

/// Read and mutate a working tree.
///
/// Every method maps a non-zero exit of the underlying tool to
/// [`VcsError::CommandFailed`] carrying its stderr.
pub trait Vcs: Send {
    /// Repository-relative paths with staged, unstaged or untracked changes.
    fn changed_files(&self) -> Result<Vec<String>, VcsError>;

    /// Diff text; `staged` compares index to HEAD, otherwise worktree to index.
    fn diff(&self, staged: bool, paths: &[String]) -> Result<String, VcsError>;

    fn diff_stat(&self) -> Result<DiffStat, VcsError>;

    fn current_branch(&self) -> Result<String, VcsError>;

    fn stage(&self, paths: &[String]) -> Result<(), VcsError>;

    /// Unstage everything, leaving the worktree untouched.
    fn reset_index(&self) -> Result<(), VcsError>;

    fn commit(&self, message: &str) -> Result<(), VcsError>;

    fn tag(&self, name: &str, message: &str) -> Result<(), VcsError>;

    fn push(&self, remote: &str, refspec: &str, set_upstream: bool) -> Result<(), VcsError>;
}
