//! Pre-commit file snapshots.
//!
//! A snapshot maps repository-relative paths to a [`SnapshotEntry`]. On the
//! wire every entry is a single string: base64 content, or one of the reserved
//! markers below. Base64 never contains `_`, so markers cannot be mistaken for
//! content.
//!
//! | Entry      | Wire form                        |
//! |------------|----------------------------------|
//! | `Absent`   | `""`                             |
//! | `TooLarge` | `__SKIPPED_TOO_LARGE_<bytes>__`  |
//! | `Error`    | `__ERROR_<message>__`            |

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const DEFAULT_SNAPSHOT_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// Longest error description kept in an error marker.
const ERROR_MESSAGE_LIMIT: usize = 50;

const TOO_LARGE_PREFIX: &str = "__SKIPPED_TOO_LARGE_";
const ERROR_PREFIX: &str = "__ERROR_";
const SKIPPED_PREFIX: &str = "__SKIPPED_";
const MARKER_SUFFIX: &str = "__";

pub type Snapshot = BTreeMap<String, SnapshotEntry>;

// ---------------------------------------------------------------------------
// SnapshotEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotEntry {
    /// Base64 of the file bytes.
    Content(String),
    /// The file did not exist; restoring deletes it.
    Absent,
    TooLarge { size: u64 },
    Error { message: String },
}

impl SnapshotEntry {
    pub fn to_marker(&self) -> String {
        match self {
            SnapshotEntry::Content(encoded) => encoded.clone(),
            SnapshotEntry::Absent => String::new(),
            SnapshotEntry::TooLarge { size } => format!("{TOO_LARGE_PREFIX}{size}{MARKER_SUFFIX}"),
            SnapshotEntry::Error { message } => format!("{ERROR_PREFIX}{message}{MARKER_SUFFIX}"),
        }
    }

    pub fn from_marker(raw: &str) -> Self {
        if raw.is_empty() {
            return SnapshotEntry::Absent;
        }
        if let Some(inner) = raw
            .strip_prefix(TOO_LARGE_PREFIX)
            .and_then(|r| r.strip_suffix(MARKER_SUFFIX))
        {
            if let Ok(size) = inner.parse() {
                return SnapshotEntry::TooLarge { size };
            }
        }
        for prefix in [ERROR_PREFIX, SKIPPED_PREFIX] {
            if let Some(inner) = raw
                .strip_prefix(prefix)
                .and_then(|r| r.strip_suffix(MARKER_SUFFIX))
            {
                return SnapshotEntry::Error {
                    message: inner.to_string(),
                };
            }
        }
        SnapshotEntry::Content(raw.to_string())
    }

    /// Decoded bytes for content entries; `None` for markers.
    pub fn content_bytes(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        match self {
            SnapshotEntry::Content(encoded) => Some(STANDARD.decode(encoded)),
            _ => None,
        }
    }

    fn error(err: &io::Error) -> Self {
        SnapshotEntry::Error {
            message: err.to_string().chars().take(ERROR_MESSAGE_LIMIT).collect(),
        }
    }
}

impl fmt::Display for SnapshotEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotEntry::Content(encoded) => write!(f, "{} bytes (base64)", encoded.len()),
            SnapshotEntry::Absent => write!(f, "absent"),
            SnapshotEntry::TooLarge { size } => write!(f, "skipped, {size} bytes"),
            SnapshotEntry::Error { message } => write!(f, "error: {message}"),
        }
    }
}

impl Serialize for SnapshotEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_marker())
    }
}

impl<'de> Deserialize<'de> for SnapshotEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SnapshotEntry::from_marker(&raw))
    }
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/// Capture `files` (relative to `root`). Never fails; problems become markers.
pub fn capture<S: AsRef<str>>(root: &Path, files: &[S], max_size: u64) -> Snapshot {
    files
        .iter()
        .map(|rel| {
            let rel = rel.as_ref();
            (rel.to_string(), capture_one(&root.join(rel), max_size))
        })
        .collect()
}

fn capture_one(path: &Path, max_size: u64) -> SnapshotEntry {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return SnapshotEntry::Absent,
        Err(err) => return SnapshotEntry::error(&err),
    };
    if meta.len() > max_size {
        return SnapshotEntry::TooLarge { size: meta.len() };
    }
    match fs::read(path) {
        Ok(bytes) => SnapshotEntry::Content(STANDARD.encode(bytes)),
        Err(err) => SnapshotEntry::error(&err),
    }
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

/// What restore did (or would do) for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Written,
    WouldWrite,
    Deleted,
    WouldDelete,
    /// Snapshot says absent and the file is still absent.
    AlreadyAbsent,
    SkippedTooLarge,
    SkippedError,
    NotInSnapshot,
    Failed { reason: String },
}

impl RestoreOutcome {
    /// True when the path was (or would be) changed on disk.
    pub fn acted(&self) -> bool {
        matches!(
            self,
            RestoreOutcome::Written
                | RestoreOutcome::WouldWrite
                | RestoreOutcome::Deleted
                | RestoreOutcome::WouldDelete
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredFile {
    pub path: String,
    pub outcome: RestoreOutcome,
}

/// Restore `paths` (default: every key) from `snapshot` into `root`.
///
/// Individual failures are reported per file and never abort the rest.
pub fn restore(
    root: &Path,
    snapshot: &Snapshot,
    paths: Option<&[String]>,
    dry_run: bool,
) -> Vec<RestoredFile> {
    let targets: Vec<String> = match paths {
        Some(paths) => paths.to_vec(),
        None => snapshot.keys().cloned().collect(),
    };

    targets
        .into_iter()
        .map(|path| {
            let outcome = match snapshot.get(&path) {
                None => RestoreOutcome::NotInSnapshot,
                Some(entry) => restore_one(root, &path, entry, dry_run),
            };
            match &outcome {
                RestoreOutcome::Failed { reason } => {
                    tracing::warn!(path = %path, reason = %reason, "restore failed")
                }
                o if o.acted() => tracing::info!(path = %path, outcome = ?o, "restored"),
                _ => {}
            }
            RestoredFile { path, outcome }
        })
        .collect()
}

/// Paths restore acted on (or would have, under dry run).
pub fn restored_paths(results: &[RestoredFile]) -> Vec<String> {
    results
        .iter()
        .filter(|r| r.outcome.acted())
        .map(|r| r.path.clone())
        .collect()
}

fn restore_one(root: &Path, rel: &str, entry: &SnapshotEntry, dry_run: bool) -> RestoreOutcome {
    let Some(target) = contained_path(root, rel) else {
        return RestoreOutcome::Failed {
            reason: "path escapes the repository root".to_string(),
        };
    };

    match entry {
        SnapshotEntry::TooLarge { .. } => RestoreOutcome::SkippedTooLarge,
        SnapshotEntry::Error { .. } => RestoreOutcome::SkippedError,
        SnapshotEntry::Absent => {
            if fs::symlink_metadata(&target).is_err() {
                RestoreOutcome::AlreadyAbsent
            } else if dry_run {
                RestoreOutcome::WouldDelete
            } else {
                match fs::remove_file(&target) {
                    Ok(()) => RestoreOutcome::Deleted,
                    Err(err) => RestoreOutcome::Failed {
                        reason: err.to_string(),
                    },
                }
            }
        }
        SnapshotEntry::Content(encoded) => {
            let bytes = match STANDARD.decode(encoded) {
                Ok(bytes) => bytes,
                Err(err) => {
                    return RestoreOutcome::Failed {
                        reason: format!("invalid base64: {err}"),
                    }
                }
            };
            if dry_run {
                return RestoreOutcome::WouldWrite;
            }
            match write_atomic(&target, &bytes) {
                Ok(()) => RestoreOutcome::Written,
                Err(err) => RestoreOutcome::Failed {
                    reason: err.to_string(),
                },
            }
        }
    }
}

/// `root/rel`, unless `rel` is absolute or climbs out with `..`.
fn contained_path(root: &Path, rel: &str) -> Option<PathBuf> {
    let rel = Path::new(rel);
    let inside = rel
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    (inside && rel.components().next().is_some()).then(|| root.join(rel))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = PathBuf::from(format!("{}.drafter.tmp", path.display()));
    fs::write(&tmp, bytes)?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}
