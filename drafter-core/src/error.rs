//! Error types for drafter-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The merged document does not fit [`crate::DrafterConfig`].
    #[error("invalid configuration: {0}")]
    Invalid(#[from] serde_yaml::Error),

    #[error("config at {path} must be a YAML mapping")]
    NotAMapping { path: PathBuf },

    #[error("invalid duration '{value}'; expected e.g. 30s, 5m, 2h or 1d")]
    InvalidDuration { value: String },

    #[error("unknown mode '{value}'; expected: plan, commit, push")]
    InvalidMode { value: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
