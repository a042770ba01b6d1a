//! Snapshots taken before a cycle commits, and the append-only cycle log.
//!
//! - [`snapshot`]: capture file contents as base64 and restore them later
//! - [`log`]: JSON-lines audit log with tail and identifier lookups

mod error;
pub mod log;
pub mod snapshot;

pub use error::AuditError;
pub use log::AuditEntry;
pub use snapshot::{RestoreOutcome, RestoredFile, Snapshot, SnapshotEntry};
