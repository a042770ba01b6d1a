//! Append-only JSON-lines audit log.
//!
//! Each line is one [`AuditEntry`]: a write-time `timestamp` plus the
//! flattened record fields. Readers skip lines that do not parse.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{io_err, AuditError};

/// First tail window for [`latest`]; doubled until a line boundary shows up.
const TAIL_WINDOW: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry<T> {
    /// RFC 3339 UTC, kept verbatim so it can be used as a lookup key.
    pub timestamp: String,
    #[serde(flatten)]
    pub record: T,
}

/// Append `record` as one line and return the timestamp it was stamped with.
pub fn record<T: Serialize>(path: &Path, record: &T) -> Result<String, AuditError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    let entry = AuditEntry {
        timestamp: timestamp.clone(),
        record,
    };
    let mut line = serde_json::to_string(&entry)?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| io_err(path, e))?;
    file.write_all(line.as_bytes())
        .map_err(|e| io_err(path, e))?;
    Ok(timestamp)
}

/// The last entry, read from the end of the file without scanning it.
///
/// `Ok(None)` for a missing or empty log and for a malformed final line.
pub fn latest<T: DeserializeOwned>(path: &Path) -> Result<Option<AuditEntry<T>>, AuditError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(path, err)),
    };
    let size = file.metadata().map_err(|e| io_err(path, e))?.len();

    let mut window = TAIL_WINDOW;
    loop {
        let offset = size.saturating_sub(window);
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| io_err(path, e))?;
        let mut buf = Vec::with_capacity((size - offset) as usize);
        file.read_to_end(&mut buf).map_err(|e| io_err(path, e))?;

        let end = buf
            .iter()
            .rposition(|b| !matches!(b, b'\n' | b'\r'))
            .map(|i| i + 1)
            .unwrap_or(0);
        let body = &buf[..end];

        let line = match body.iter().rposition(|b| *b == b'\n') {
            Some(newline) => &body[newline + 1..],
            None if offset == 0 => body,
            None => {
                window = window.saturating_mul(2);
                continue;
            }
        };
        if line.is_empty() {
            return Ok(None);
        }
        return Ok(serde_json::from_slice(line).ok());
    }
}

/// First entry whose `tag` or `timestamp` equals `id`.
pub fn find<T: DeserializeOwned>(path: &Path, id: &str) -> Result<Option<AuditEntry<T>>, AuditError> {
    let Some(reader) = open_reader(path)? else {
        return Ok(None);
    };
    for line in reader.split(b'\n') {
        let line = line.map_err(|e| io_err(path, e))?;
        let Ok(value) = serde_json::from_slice::<Value>(&line) else {
            continue;
        };
        let matches = ["tag", "timestamp"]
            .iter()
            .any(|key| value.get(key).and_then(Value::as_str) == Some(id));
        if !matches {
            continue;
        }
        if let Ok(entry) = serde_json::from_value(value) {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

/// Every well-formed entry, oldest first.
pub fn entries<T: DeserializeOwned>(path: &Path) -> Result<Vec<AuditEntry<T>>, AuditError> {
    let Some(reader) = open_reader(path)? else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for line in reader.split(b'\n') {
        let line = line.map_err(|e| io_err(path, e))?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice(&line) {
            Ok(entry) => out.push(entry),
            Err(err) => tracing::debug!(error = %err, "skipping malformed audit line"),
        }
    }
    Ok(out)
}

fn open_reader(path: &Path) -> Result<Option<BufReader<File>>, AuditError> {
    match File::open(path) {
        Ok(file) => Ok(Some(BufReader::new(file))),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}
