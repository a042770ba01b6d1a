//! Size-capped rotation for `.drafter/logs/drafter.log`.
//!
//! Once the live file reaches the cap it becomes `drafter.log.1`, older copies
//! shift up by one and the copy past `keep` is deleted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use drafter_core::paths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation {
    pub max_bytes: u64,
    pub keep: usize,
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            keep: 5,
        }
    }
}

impl Rotation {
    /// Rotate `live` when it is at or over the cap. `Ok(false)` when it is
    /// smaller or missing.
    pub fn apply(&self, live: &Path) -> io::Result<bool> {
        let size = match fs::metadata(live) {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err),
        };
        if size < self.max_bytes || self.keep == 0 {
            return Ok(false);
        }

        remove_if_present(&backup(live, self.keep))?;
        for n in (1..self.keep).rev() {
            let from = backup(live, n);
            if from.exists() {
                fs::rename(&from, backup(live, n + 1))?;
            }
        }
        fs::rename(live, backup(live, 1))?;
        Ok(true)
    }
}

/// Rotate the repository log under `root`, logging the outcome.
pub fn rotate_repo_log(root: &Path, rotation: Rotation) {
    let live = paths::log_path(root);
    match rotation.apply(&live) {
        Ok(true) => tracing::info!(path = %live.display(), "log rotated"),
        Ok(false) => {}
        Err(err) => tracing::warn!(path = %live.display(), error = %err, "log rotation failed"),
    }
}

fn backup(live: &Path, n: usize) -> PathBuf {
    let mut name = live.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{n}"));
    live.with_file_name(name)
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}
