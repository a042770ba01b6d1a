//! One cycle, start to finish.
//!
//! ```text
//! changed files ─► plan ─► diff ─► policy ─┬─ none ─────────► no_changes
//!                                          ├─ errors ───────► blocked
//!                                          ├─ plan mode ────► planned
//!                                          └─ snapshot ─► commit groups ─► tag
//!                                                               │
//!                                              push mode ─► confirm ─► push ─► pushed | commit_only
//! ```
//!
//! Every branch ends in `finish`, which appends the audit line
//! and replaces the held report.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use drafter_audit::{log, snapshot};
use drafter_core::{paths, DrafterConfig, Mode, PlanResult};
use drafter_plan::{build_adapter, Planner};
use drafter_policy::{run_checks, PolicyInput};
use drafter_vcs::{Git, Vcs};

use crate::error::CycleError;
use crate::report::{CycleReport, CycleStatus};

pub const DEFAULT_SUBJECT: &str = "chore: automated update";
pub const CATCH_ALL_MESSAGE: &str = "chore: miscellaneous updates";
pub const TAG_MESSAGE: &str = "drafter cycle tag";
const TAG_PREFIX: &str = "drafter-";
const SUBJECT_LIMIT: usize = 72;

pub struct CycleEngine {
    root: PathBuf,
    config: DrafterConfig,
    vcs: Box<dyn Vcs>,
    planner: Planner,
    audit_path: PathBuf,
    last_report: Option<CycleReport>,
}

impl CycleEngine {
    pub fn new(
        root: impl Into<PathBuf>,
        config: DrafterConfig,
        vcs: Box<dyn Vcs>,
        planner: Planner,
    ) -> Self {
        let root = root.into();
        let audit_path = paths::audit_log_path(&root);
        Self {
            root,
            config,
            vcs,
            planner,
            audit_path,
            last_report: None,
        }
    }

    pub fn with_audit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.audit_path = path.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &DrafterConfig {
        &self.config
    }

    pub fn audit_path(&self) -> &Path {
        &self.audit_path
    }

    pub fn last_report(&self) -> Option<&CycleReport> {
        self.last_report.as_ref()
    }

    /// Branch pushes land on: the configured template with `${USER}` resolved.
    pub fn target_branch(&self) -> String {
        self.config.resolved_branch()
    }

    /// Run one cycle, approving any push.
    pub fn execute(&mut self, mode: Mode) -> Result<CycleReport, CycleError> {
        self.execute_with(mode, &|_: &CycleReport| true)
    }

    /// Run one cycle; `confirm` is asked once before pushing.
    pub fn execute_with(
        &mut self,
        mode: Mode,
        confirm: &dyn Fn(&CycleReport) -> bool,
    ) -> Result<CycleReport, CycleError> {
        let files: Vec<String> = self
            .vcs
            .changed_files()?
            .into_iter()
            .filter(|path| !paths::is_state_path(path))
            .collect();
        let branch = self.target_branch();
        debug!(files = files.len(), branch = %branch, mode = %mode, "cycle started");

        let plan = self.planner.build_plan(&files);
        let diff_text = self.vcs.diff(false, &[])?;
        let diff_stat = self.vcs.diff_stat()?;
        let policy = run_checks(&PolicyInput::from_config(&self.config, &diff_text, &branch));

        if files.is_empty() {
            let report = CycleReport::new(
                CycleStatus::NoChanges,
                plan,
                policy,
                diff_text,
                diff_stat,
                branch,
                "No changes detected.",
            );
            return Ok(self.finish(report));
        }

        if !policy.passed {
            let errors: Vec<String> = policy.errors().map(|m| m.message.clone()).collect();
            let mut report = CycleReport::new(
                CycleStatus::Blocked,
                plan,
                policy,
                diff_text,
                diff_stat,
                branch,
                "Policy checks failed.",
            );
            report.errors = errors;
            return Ok(self.finish(report));
        }

        if mode == Mode::Plan {
            let report = CycleReport::new(
                CycleStatus::Planned,
                plan,
                policy,
                diff_text,
                diff_stat,
                branch,
                "Plan generated (plan-only mode).",
            );
            return Ok(self.finish(report));
        }

        let captured = snapshot::capture(&self.root, &files, self.config.snapshot_max_size);
        let commits = self.commit_groups(&plan, &files)?;
        let tag = if commits.is_empty() {
            None
        } else {
            Some(self.tag_cycle()?)
        };

        let mut report = CycleReport::new(
            CycleStatus::Committed,
            plan,
            policy,
            diff_text,
            diff_stat,
            branch,
            "Committed grouped changes.",
        );
        report.commits = commits;
        report.tag = tag;
        report.snapshot = captured;

        if mode == Mode::Push {
            if confirm(&report) {
                report.pushed = self.push(&report.branch);
                if report.pushed {
                    report.status = CycleStatus::Pushed;
                    report.message = "Changes pushed to remote.".to_string();
                } else {
                    report.status = CycleStatus::CommitOnly;
                    report.message = "Push failed; commits kept locally.".to_string();
                }
            } else {
                report.status = CycleStatus::CommitOnly;
                report.message = "Push canceled by user.".to_string();
            }
        }

        Ok(self.finish(report))
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    fn commit_groups(&self, plan: &PlanResult, files: &[String]) -> Result<Vec<String>, CycleError> {
        let mut remaining: BTreeSet<&str> = files.iter().map(String::as_str).collect();
        let mut commits = Vec::new();

        for group in &plan.groups {
            let relevant: Vec<String> = group
                .files
                .iter()
                .filter(|path| remaining.contains(path.as_str()))
                .cloned()
                .collect();
            if relevant.is_empty() {
                continue;
            }
            if !self.stage_only(&relevant)? {
                debug!(title = %group.title, "group has no staged diff, skipping");
                continue;
            }

            let message = commit_message(&group.title, &group.body);
            self.vcs.commit(&message)?;
            commits.push(subject_line(&message));
            for path in &relevant {
                remaining.remove(path.as_str());
            }
        }

        if !remaining.is_empty() {
            let leftover: Vec<String> = remaining.into_iter().map(str::to_string).collect();
            if self.stage_only(&leftover)? {
                self.vcs.commit(CATCH_ALL_MESSAGE)?;
                commits.push(CATCH_ALL_MESSAGE.to_string());
            }
        }

        Ok(commits)
    }

    /// Reset the index and stage exactly `files`. False when nothing ended up staged.
    fn stage_only(&self, files: &[String]) -> Result<bool, CycleError> {
        self.vcs.reset_index()?;
        self.vcs.stage(files)?;
        Ok(!self.vcs.diff(true, &[])?.trim().is_empty())
    }

    fn tag_cycle(&self) -> Result<String, CycleError> {
        let name = format!("{TAG_PREFIX}{}", Utc::now().format("%Y%m%d-%H%M%S"));
        self.vcs.tag(&name, TAG_MESSAGE)?;
        Ok(name)
    }

    /// Push `HEAD:<branch>`, retrying once with upstream tracking. Never errors.
    fn push(&self, branch: &str) -> bool {
        let remote = self.config.remote.as_str();
        let refspec = format!("HEAD:{branch}");
        match self.vcs.push(remote, &refspec, false) {
            Ok(()) => return true,
            Err(err) => debug!(error = %err, "push failed, retrying with upstream"),
        }
        match self.vcs.push(remote, &refspec, true) {
            Ok(()) => true,
            Err(err) => {
                warn!(remote, branch, error = %err, "push failed");
                false
            }
        }
    }

    fn finish(&mut self, report: CycleReport) -> CycleReport {
        if let Err(err) = log::record(&self.audit_path, &report.record()) {
            error!(path = %self.audit_path.display(), error = %err, "audit write failed");
        }
        info!(
            status = %report.status,
            commits = report.commits.len(),
            pushed = report.pushed,
            "cycle finished",
        );
        self.last_report = Some(report.clone());
        report
    }
}

/// Engine over a real git worktree. A provider that cannot be built is logged
/// and planning falls back to heuristics.
pub fn open(root: &Path, config: DrafterConfig) -> CycleEngine {
    let adapter = match build_adapter(&config) {
        Ok(adapter) => adapter,
        Err(err) => {
            warn!(error = %err, "provider unavailable, using heuristic planning");
            None
        }
    };
    CycleEngine::new(root, config, Box::new(Git::new(root)), Planner::new(adapter))
}

/// Push confirmation shared by the daemon and the CLI: refuses protected
/// branches while `smart_push.respect_protected` is on.
pub fn push_allowed(config: &DrafterConfig, report: &CycleReport) -> bool {
    if config.smart_push.respect_protected && config.is_protected(&report.branch) {
        warn!(branch = %report.branch, "not pushing to protected branch");
        return false;
    }
    true
}

fn commit_message(title: &str, body: &str) -> String {
    let trimmed = title.trim();
    let subject: String = if trimmed.is_empty() {
        DEFAULT_SUBJECT.to_string()
    } else {
        trimmed.chars().take(SUBJECT_LIMIT).collect()
    };
    let body = body.trim();
    if body.is_empty() {
        subject
    } else {
        format!("{subject}\n\n{body}")
    }
}

fn subject_line(message: &str) -> String {
    message.lines().next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_is_trimmed_and_capped() {
        let long = format!("  {}  ", "x".repeat(100));
        let message = commit_message(&long, "");
        assert_eq!(message.chars().count(), SUBJECT_LIMIT);
        assert!(!message.contains(' '));
    }

    #[test]
    fn blank_title_gets_default_subject() {
        assert_eq!(commit_message("   ", ""), DEFAULT_SUBJECT);
    }

    #[test]
    fn body_follows_a_blank_line() {
        let message = commit_message("feat: parser", "  Adds the parser.\n");
        assert_eq!(message, "feat: parser\n\nAdds the parser.");
        assert_eq!(subject_line(&message), "feat: parser");
    }

    #[test]
    fn push_guard_respects_protected_setting() {
        let mut config = DrafterConfig::default();
        let mut report = CycleReport::new(
            CycleStatus::Committed,
            PlanResult::empty(),
            Default::default(),
            String::new(),
            Default::default(),
            "main".to_string(),
            "",
        );
        assert!(!push_allowed(&config, &report));

        config.smart_push.respect_protected = false;
        assert!(push_allowed(&config, &report));

        config.smart_push.respect_protected = true;
        report.branch = "auto/dev".to_string();
        assert!(push_allowed(&config, &report));
    }
}
