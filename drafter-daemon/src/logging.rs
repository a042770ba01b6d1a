//! Process-wide tracing setup.
//!
//! `RUST_LOG` takes precedence over the level passed in. With a log file the
//! file is reopened in append mode for every event, so rotation can rename it
//! underneath a running process.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. Later calls are no-ops.
pub fn init(level: &str, log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(AppendFile::new(path))
                .try_init();
        }
        None => {
            let _ = fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(io::stderr)
                .try_init();
        }
    }
}

/// Level implied by `-v`/`-q` on top of the configured one.
pub fn effective_level(configured: &str, verbose: u8, quiet: bool) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

#[derive(Debug, Clone)]
struct AppendFile {
    path: PathBuf,
}

impl AppendFile {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

enum Sink {
    File(File),
    Stderr(io::Stderr),
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::File(file) => file.write(buf),
            Sink::Stderr(err) => err.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::File(file) => file.flush(),
            Sink::Stderr(err) => err.flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for AppendFile {
    type Writer = Sink;

    fn make_writer(&'a self) -> Self::Writer {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map(Sink::File)
            .unwrap_or_else(|_| Sink::Stderr(io::stderr()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_configured_level() {
        assert_eq!(effective_level("info", 0, false), "info");
        assert_eq!(effective_level("info", 1, false), "debug");
        assert_eq!(effective_level("warn", 3, false), "trace");
        assert_eq!(effective_level("debug", 2, true), "error");
    }

    #[test]
    fn append_writer_survives_rename() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("drafter.log");
        let writer = AppendFile::new(&path);

        writer.make_writer().write_all(b"one\n").unwrap();
        fs::rename(&path, dir.path().join("drafter.log.1")).unwrap();
        writer.make_writer().write_all(b"two\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "two\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("drafter.log.1")).unwrap(),
            "one\n"
        );
    }
}
