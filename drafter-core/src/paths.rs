use std::path::{Component, Path, PathBuf};

pub const STATE_DIR: &str = ".drafter";
pub const CONFIG_FILE: &str = ".drafter.yml";
pub const AUDIT_LOG: &str = "audit.jsonl";
pub const LOG_FILE: &str = "drafter.log";

pub fn state_dir(root: &Path) -> PathBuf {
    root.join(STATE_DIR)
}

pub fn audit_log_path(root: &Path) -> PathBuf {
    state_dir(root).join(AUDIT_LOG)
}

pub fn logs_dir(root: &Path) -> PathBuf {
    state_dir(root).join("logs")
}

pub fn log_path(root: &Path) -> PathBuf {
    logs_dir(root).join(LOG_FILE)
}

pub fn repo_config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// `<config dir>/drafter/config.yml`, when the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("drafter").join("config.yml"))
}

/// True for repository-relative paths that live inside drafter's own state directory.
pub fn is_state_path(relative: &str) -> bool {
    Path::new(relative)
        .components()
        .next()
        .map(|first| first == Component::Normal(STATE_DIR.as_ref()))
        .unwrap_or(false)
}
