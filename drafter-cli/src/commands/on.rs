//! `drafter on [--status-port <port>]`

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::load_config;

/// Watch the repository and run cycles until Ctrl-C.
#[derive(Args, Debug)]
pub struct OnArgs {
    /// Port for the status endpoint on 127.0.0.1 (0 picks a free port).
    #[arg(long, value_name = "PORT")]
    pub status_port: Option<u16>,
}

impl OnArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let mut config = load_config(root)?;
        if let Some(port) = self.status_port {
            config.status_port = port;
        }

        println!(
            "{} watching {} (mode {}, idle {}, batch window {})",
            "drafter".bold(),
            root.display(),
            config.mode,
            config.idle,
            config.batch_window,
        );
        drafter_daemon::start_blocking(root, config).context("watcher stopped with an error")?;
        println!("✓ Stopped");
        Ok(())
    }
}
