//! Domain types shared by the planner, the policy gate and the cycle engine.
//!
//! Everything here is plain data: serializable via serde so it can land in the
//! audit log and the status endpoint unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// How far a cycle is allowed to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Build and report a plan; never mutate the repository.
    Plan,
    /// Commit grouped changes locally.
    Commit,
    /// Commit, then push to the configured remote.
    #[default]
    Push,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Plan => write!(f, "plan"),
            Mode::Commit => write!(f, "commit"),
            Mode::Push => write!(f, "push"),
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plan" => Ok(Mode::Plan),
            "commit" => Ok(Mode::Commit),
            "push" => Ok(Mode::Push),
            _ => Err(ConfigError::InvalidMode {
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// One proposed commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPlan {
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub files: Vec<String>,
}

impl GroupPlan {
    pub fn new(title: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            title: title.into(),
            body: String::new(),
            files,
        }
    }
}

/// Where a plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanSource {
    #[default]
    Heuristic,
    Llm,
    Empty,
}

impl fmt::Display for PlanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanSource::Heuristic => write!(f, "heuristic"),
            PlanSource::Llm => write!(f, "llm"),
            PlanSource::Empty => write!(f, "empty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PlanResult {
    pub groups: Vec<GroupPlan>,
    pub source: PlanSource,
    /// Provider output the groups were parsed from, for `llm` plans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl PlanResult {
    pub fn empty() -> Self {
        Self {
            groups: Vec::new(),
            source: PlanSource::Empty,
            raw_response: None,
        }
    }

    pub fn heuristic(groups: Vec<GroupPlan>) -> Self {
        Self {
            groups,
            source: PlanSource::Heuristic,
            raw_response: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyMessage {
    pub severity: Severity,
    pub message: String,
}

/// Aggregate outcome of the policy gate. `passed` is false iff any message is an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyResult {
    pub passed: bool,
    pub messages: Vec<PolicyMessage>,
}

impl Default for PolicyResult {
    fn default() -> Self {
        Self {
            passed: true,
            messages: Vec::new(),
        }
    }
}

impl PolicyResult {
    pub fn add(&mut self, severity: Severity, message: impl Into<String>) {
        if severity == Severity::Error {
            self.passed = false;
        }
        self.messages.push(PolicyMessage {
            severity,
            message: message.into(),
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &PolicyMessage> {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &PolicyMessage> {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Warning)
    }
}

// ---------------------------------------------------------------------------
// Diff statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiffStat {
    pub insertions: u64,
    pub deletions: u64,
}

impl DiffStat {
    pub fn total(&self) -> u64 {
        self.insertions + self.deletions
    }
}
