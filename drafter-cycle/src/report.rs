//! Cycle outcomes: the in-memory report and its persisted projection.

use std::fmt;

use serde::{Deserialize, Serialize};

use drafter_audit::Snapshot;
use drafter_core::{DiffStat, GroupPlan, PlanResult, PlanSource, PolicyMessage, PolicyResult};

/// Terminal state of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    NoChanges,
    Blocked,
    Planned,
    Committed,
    Pushed,
    CommitOnly,
}

impl CycleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CycleStatus::NoChanges => "no_changes",
            CycleStatus::Blocked => "blocked",
            CycleStatus::Planned => "planned",
            CycleStatus::Committed => "committed",
            CycleStatus::Pushed => "pushed",
            CycleStatus::CommitOnly => "commit_only",
        }
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub status: CycleStatus,
    pub plan: PlanResult,
    pub policy: PolicyResult,
    pub diff_text: String,
    pub diff_stat: DiffStat,
    /// Subject lines, in commit order.
    pub commits: Vec<String>,
    pub tag: Option<String>,
    pub pushed: bool,
    pub branch: String,
    pub errors: Vec<String>,
    pub message: String,
    /// Empty unless the cycle reached the commit step.
    pub snapshot: Snapshot,
}

impl CycleReport {
    pub(crate) fn new(
        status: CycleStatus,
        plan: PlanResult,
        policy: PolicyResult,
        diff_text: String,
        diff_stat: DiffStat,
        branch: String,
        message: &str,
    ) -> Self {
        Self {
            status,
            plan,
            policy,
            diff_text,
            diff_stat,
            commits: Vec::new(),
            tag: None,
            pushed: false,
            branch,
            errors: Vec::new(),
            message: message.to_string(),
            snapshot: Snapshot::new(),
        }
    }

    /// The serialisable view: everything but the raw diff.
    pub fn record(&self) -> CycleRecord {
        CycleRecord {
            status: self.status,
            message: self.message.clone(),
            plan_source: self.plan.source,
            groups: self.plan.groups.clone(),
            policy: self.policy.messages.clone(),
            commits: self.commits.clone(),
            tag: self.tag.clone(),
            pushed: self.pushed,
            branch: self.branch.clone(),
            errors: self.errors.clone(),
            diff_stat: self.diff_stat,
            snapshot: self.snapshot.clone(),
        }
    }
}

/// One audit line and one status-endpoint payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub status: CycleStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub plan_source: PlanSource,
    #[serde(default)]
    pub groups: Vec<GroupPlan>,
    #[serde(default)]
    pub policy: Vec<PolicyMessage>,
    #[serde(default)]
    pub commits: Vec<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub pushed: bool,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub diff_stat: DiffStat,
    #[serde(default)]
    pub snapshot: Snapshot,
}
