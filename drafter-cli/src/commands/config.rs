//! `drafter config [--json]` and `drafter switch <mode>`

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use drafter_core::config::{self, ConfigWrite};
use drafter_core::Mode;

use super::load_config;

/// Print the effective configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Emit JSON instead of YAML.
    #[arg(long)]
    pub json: bool,
}

impl ConfigArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let config = load_config(root)?;
        let text = if self.json {
            serde_json::to_string_pretty(&config).context("failed to serialize config JSON")?
        } else {
            serde_yaml::to_string(&config).context("failed to serialize config YAML")?
        };
        println!("{}", text.trim_end());
        Ok(())
    }
}

/// Persist a new default mode in .drafter.yml.
#[derive(Args, Debug)]
pub struct SwitchArgs {
    /// plan, commit or push.
    pub mode: Mode,
}

impl SwitchArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let write = config::set_repo_value(
            root,
            "mode",
            serde_yaml::Value::String(self.mode.to_string()),
        )
        .with_context(|| format!("failed to switch to mode '{}'", self.mode))?;

        let (ConfigWrite::Updated { path }
        | ConfigWrite::Created { path }
        | ConfigWrite::AlreadyExists { path }) = write;
        println!("✓ Mode set to {} in {}", self.mode, path.display());
        Ok(())
    }
}
