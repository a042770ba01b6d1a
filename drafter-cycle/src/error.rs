use thiserror::Error;

use drafter_vcs::VcsError;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("version control failed: {0}")]
    Vcs(#[from] VcsError),
}
