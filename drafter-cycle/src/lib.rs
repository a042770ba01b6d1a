//! The cycle state machine: plan, gate, snapshot, commit, push, audit.
//!
//! [`CycleEngine`] owns the repository handle and the last report. The daemon
//! and the CLI both drive it; neither touches git directly.

pub mod engine;
mod error;
pub mod report;

pub use engine::{open, push_allowed, CycleEngine, CATCH_ALL_MESSAGE, DEFAULT_SUBJECT, TAG_MESSAGE};
pub use error::CycleError;
pub use report::{CycleRecord, CycleReport, CycleStatus};
