//! Layered YAML configuration.
//!
//! Built-in defaults are overlaid first by the user file
//! (`<config dir>/drafter/config.yml`) and then by the repository file
//! (`.drafter.yml`). Mappings merge key by key; any other value replaces the
//! one beneath it.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{io_err, ConfigError};
use crate::paths;
use crate::types::Mode;

/// Placeholder in the branch template replaced by the current user name.
pub const USER_PLACEHOLDER: &str = "${USER}";

const USER_ENV_VARS: &[&str] = &["LOGNAME", "USER", "LNAME", "USERNAME"];

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmartPush {
    /// Ask before pushing from interactive commands.
    pub ask: bool,
    /// Diffs with more added/removed lines than this are blocked.
    pub max_diff_lines: usize,
    /// Never push to a protected branch.
    pub respect_protected: bool,
}

impl Default for SmartPush {
    fn default() -> Self {
        Self {
            ask: true,
            max_diff_lines: 1000,
            respect_protected: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrafterConfig {
    pub mode: Mode,
    /// Target branch template; `${USER}` is substituted at cycle time.
    pub branch: String,
    pub idle: String,
    pub batch_window: String,
    pub secret_scan: bool,
    pub smart_push: SmartPush,
    /// `ollama`, `openai`, `anthropic`, `google` or `none`.
    pub provider: String,
    pub model: String,
    pub ollama_host: String,
    pub log_level: String,
    pub log_to_file: bool,
    pub snapshot_max_size: u64,
    pub large_file_threshold: usize,
    pub secret_patterns: Vec<String>,
    pub protected_branches: Vec<String>,
    pub remote: String,
    /// Port for the status endpoint; 0 picks a free one.
    pub status_port: u16,
}

impl Default for DrafterConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Push,
            branch: format!("auto/{USER_PLACEHOLDER}"),
            idle: "30s".to_string(),
            batch_window: "5m".to_string(),
            secret_scan: true,
            smart_push: SmartPush::default(),
            provider: "ollama".to_string(),
            model: "qwen2.5-coder:14b".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            log_level: "info".to_string(),
            log_to_file: false,
            snapshot_max_size: 10 * 1024 * 1024,
            large_file_threshold: 500,
            secret_patterns: Vec::new(),
            protected_branches: vec![
                "main".to_string(),
                "master".to_string(),
                "production".to_string(),
            ],
            remote: "origin".to_string(),
            status_port: 0,
        }
    }
}

impl DrafterConfig {
    pub fn idle_duration(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.idle)
    }

    pub fn batch_window_duration(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.batch_window)
    }

    /// Branch template with `${USER}` resolved from the environment.
    pub fn resolved_branch(&self) -> String {
        resolve_branch(&self.branch, &current_user())
    }

    pub fn is_protected(&self, branch: &str) -> bool {
        self.protected_branches.iter().any(|b| b == branch)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.idle_duration()?;
        self.batch_window_duration()?;
        Ok(())
    }
}

pub fn resolve_branch(template: &str, user: &str) -> String {
    template.replace(USER_PLACEHOLDER, user)
}

fn current_user() -> String {
    USER_ENV_VARS
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Parse `30s`, `5m`, `2h` or `1d` into a [`Duration`].
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration {
        value: value.to_string(),
    };
    let trimmed = value.trim();
    let unit = trimmed.chars().last().ok_or_else(invalid)?;
    let digits = &trimmed[..trimmed.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    let scale: u64 = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 60 * 60 * 24,
        _ => return Err(invalid()),
    };
    let seconds = amount.checked_mul(scale).ok_or_else(invalid)?;
    Ok(Duration::from_secs(seconds))
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load the effective config for the repository at `root`, including the user file.
pub fn load(root: &Path) -> Result<DrafterConfig, ConfigError> {
    let user = paths::user_config_path();
    load_at(root, user.as_deref())
}

/// Load with an explicit user-level file (or none).
pub fn load_at(root: &Path, user_config: Option<&Path>) -> Result<DrafterConfig, ConfigError> {
    let mut merged = serde_yaml::to_value(DrafterConfig::default())?;

    let mut layers: Vec<PathBuf> = user_config.map(Path::to_path_buf).into_iter().collect();
    layers.push(paths::repo_config_path(root));

    for path in layers {
        if let Some(layer) = read_layer(&path)? {
            merge_yaml(&mut merged, Value::Mapping(layer));
        }
    }

    let config: DrafterConfig = serde_yaml::from_value(merged)?;
    config.validate()?;
    Ok(config)
}

fn read_layer(path: &Path) -> Result<Option<Mapping>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Null => Ok(None),
        Value::Mapping(mapping) => Ok(Some(mapping)),
        _ => Err(ConfigError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

/// Deep-merge `overlay` into `base`.
pub fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) if existing.is_mapping() && value.is_mapping() => {
                        merge_yaml(existing, value);
                    }
                    _ => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Outcome of writing the repository config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWrite {
    Created { path: PathBuf },
    AlreadyExists { path: PathBuf },
    Updated { path: PathBuf },
}

/// Write the built-in defaults to `.drafter.yml` unless the file exists.
pub fn write_default(root: &Path) -> Result<ConfigWrite, ConfigError> {
    let path = paths::repo_config_path(root);
    if path.exists() {
        return Ok(ConfigWrite::AlreadyExists { path });
    }
    let text = serde_yaml::to_string(&DrafterConfig::default())?;
    write_atomic(&path, &text)?;
    Ok(ConfigWrite::Created { path })
}

/// Set one top-level key in `.drafter.yml`, keeping everything else in the file.
pub fn set_repo_value(root: &Path, key: &str, value: Value) -> Result<ConfigWrite, ConfigError> {
    let path = paths::repo_config_path(root);
    let mut mapping = read_layer(&path)?.unwrap_or_default();
    mapping.insert(Value::String(key.to_string()), value);

    // Reject values that would make the file unloadable.
    let mut merged = serde_yaml::to_value(DrafterConfig::default())?;
    merge_yaml(&mut merged, Value::Mapping(mapping.clone()));
    let candidate: DrafterConfig = serde_yaml::from_value(merged)?;
    candidate.validate()?;

    let text = serde_yaml::to_string(&mapping)?;
    write_atomic(&path, &text)?;
    Ok(ConfigWrite::Updated { path })
}

fn write_atomic(path: &Path, text: &str) -> Result<(), ConfigError> {
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    fs::write(&tmp, text).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}
