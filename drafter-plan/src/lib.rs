//! Grouping engine: turns a list of changed paths into proposed commits.
//!
//! [`heuristic::heuristic_groups`] always runs. When a provider
//! [`adapter::Adapter`] is configured, [`Planner`] asks it to refine the
//! heuristic plan and falls back to the heuristic groups on any failure.

pub mod adapter;
mod error;
pub mod heuristic;
pub mod planner;
mod prompt;

pub use adapter::{build_adapter, Adapter, LlmRequest};
pub use error::{AdapterError, RefineError};
pub use heuristic::heuristic_groups;
pub use planner::{parse_groups, Planner, SYSTEM_PROMPT};
