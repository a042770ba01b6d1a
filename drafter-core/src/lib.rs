//! drafter core library: domain types, layered configuration, state paths.
//!
//! - [`types`]: plan, policy and diff value types shared by every crate
//! - [`config`]: [`DrafterConfig`] with YAML layering
//! - [`paths`]: where drafter keeps its state inside a repository
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::{parse_duration, DrafterConfig, SmartPush};
pub use error::ConfigError;
pub use types::{
    DiffStat, GroupPlan, Mode, PlanResult, PlanSource, PolicyMessage, PolicyResult, Severity,
};
