use std::collections::BTreeSet;
use std::fs;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use drafter_audit::log;
use drafter_core::{DiffStat, DrafterConfig, Mode, PlanSource};
use drafter_cycle::{
    CycleEngine, CycleError, CycleRecord, CycleReport, CycleStatus, CATCH_ALL_MESSAGE, TAG_MESSAGE,
};
use drafter_plan::{Adapter, AdapterError, LlmRequest, Planner};
use drafter_vcs::{Vcs, VcsError};

// ---------------------------------------------------------------------------
// In-memory repository
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    changed: Vec<String>,
    diff: String,
    /// Paths whose staging produces no diff (whitespace no-ops).
    inert: BTreeSet<String>,
    staged: Vec<String>,
    commits: Vec<(String, Vec<String>)>,
    tags: Vec<(String, String)>,
    pushes: Vec<(String, String, bool)>,
    failing_pushes: usize,
    failing_stage: bool,
    failing_commit: bool,
    mutations: usize,
}

#[derive(Clone, Default)]
struct FakeVcs(Arc<Mutex<State>>);

impl FakeVcs {
    fn with_changes(paths: &[&str], diff: &str) -> Self {
        let fake = FakeVcs::default();
        {
            let mut state = fake.0.lock().unwrap();
            state.changed = paths.iter().map(|p| p.to_string()).collect();
            state.diff = diff.to_string();
        }
        fake
    }
}

impl Vcs for FakeVcs {
    fn changed_files(&self) -> Result<Vec<String>, VcsError> {
        Ok(self.0.lock().unwrap().changed.clone())
    }

    fn diff(&self, staged: bool, _paths: &[String]) -> Result<String, VcsError> {
        let state = self.0.lock().unwrap();
        if staged {
            let live = state.staged.iter().any(|p| !state.inert.contains(p));
            return Ok(if live { "diff --git a/x b/x\n+x\n".into() } else { String::new() });
        }
        Ok(state.diff.clone())
    }

    fn diff_stat(&self) -> Result<DiffStat, VcsError> {
        let state = self.0.lock().unwrap();
        let insertions = state.diff.lines().filter(|l| l.starts_with('+')).count() as u64;
        Ok(DiffStat {
            insertions,
            deletions: 0,
        })
    }

    fn current_branch(&self) -> Result<String, VcsError> {
        Ok("main".to_string())
    }

    fn stage(&self, paths: &[String]) -> Result<(), VcsError> {
        let mut state = self.0.lock().unwrap();
        state.mutations += 1;
        if state.failing_stage {
            return Err(rejected("add"));
        }
        state.staged.extend(paths.iter().cloned());
        Ok(())
    }

    fn reset_index(&self) -> Result<(), VcsError> {
        let mut state = self.0.lock().unwrap();
        state.mutations += 1;
        state.staged.clear();
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<(), VcsError> {
        let mut state = self.0.lock().unwrap();
        state.mutations += 1;
        if state.failing_commit {
            return Err(rejected("commit"));
        }
        let staged = std::mem::take(&mut state.staged);
        state.changed.retain(|p| !staged.contains(p));
        if state.changed.is_empty() {
            state.diff.clear();
        }
        state.commits.push((message.to_string(), staged));
        Ok(())
    }

    fn tag(&self, name: &str, message: &str) -> Result<(), VcsError> {
        let mut state = self.0.lock().unwrap();
        state.mutations += 1;
        state.tags.push((name.to_string(), message.to_string()));
        Ok(())
    }

    fn push(&self, remote: &str, refspec: &str, set_upstream: bool) -> Result<(), VcsError> {
        let mut state = self.0.lock().unwrap();
        state.mutations += 1;
        state
            .pushes
            .push((remote.to_string(), refspec.to_string(), set_upstream));
        if state.failing_pushes > 0 {
            state.failing_pushes -= 1;
            return Err(VcsError::CommandFailed {
                command: format!("push {remote} {refspec}"),
                stderr: "rejected".to_string(),
            });
        }
        Ok(())
    }
}

fn rejected(command: &str) -> VcsError {
    VcsError::CommandFailed {
        command: command.to_string(),
        stderr: "fatal: index.lock exists".to_string(),
    }
}

struct Harness {
    _dir: TempDir,
    audit: std::path::PathBuf,
    vcs: FakeVcs,
    engine: CycleEngine,
}

fn harness(vcs: FakeVcs) -> Harness {
    harness_with(vcs, DrafterConfig::default())
}

fn harness_with(vcs: FakeVcs, mut config: DrafterConfig) -> Harness {
    let dir = TempDir::new().unwrap();
    config.branch = "auto/dev".to_string();
    let audit = dir.path().join(".drafter/audit.jsonl");
    let engine = CycleEngine::new(
        dir.path(),
        config,
        Box::new(vcs.clone()),
        Planner::heuristic_only(),
    )
    .with_audit_path(&audit);
    Harness {
        _dir: dir,
        audit,
        vcs,
        engine,
    }
}

fn added_lines(n: usize) -> String {
    let mut diff = String::from("diff --git a/big.txt b/big.txt\n--- a/big.txt\n+++ b/big.txt\n");
    for i in 0..n {
        diff.push_str(&format!("+line {i}\n"));
    }
    diff
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn clean_tree_is_no_changes_and_idempotent() {
    let mut h = harness(FakeVcs::default());

    for _ in 0..2 {
        let report = h.engine.execute(Mode::Push).unwrap();
        assert_eq!(report.status, CycleStatus::NoChanges);
        assert_eq!(report.message, "No changes detected.");
        assert_eq!(report.plan.source, PlanSource::Empty);
    }
    assert_eq!(h.vcs.0.lock().unwrap().mutations, 0);
    assert_eq!(log::entries::<CycleRecord>(&h.audit).unwrap().len(), 2);
}

#[test]
fn second_cycle_after_commit_sees_nothing() {
    let vcs = FakeVcs::with_changes(&["a.py"], "diff --git a/a.py b/a.py\n+x\n");
    let mut h = harness(vcs);

    let first = h.engine.execute(Mode::Commit).unwrap();
    assert_eq!(first.status, CycleStatus::Committed);
    let mutations = h.vcs.0.lock().unwrap().mutations;

    let second = h.engine.execute(Mode::Commit).unwrap();
    assert_eq!(second.status, CycleStatus::NoChanges);
    assert_eq!(h.vcs.0.lock().unwrap().mutations, mutations);
}

#[test]
fn oversized_diff_blocks_the_cycle() {
    let mut config = DrafterConfig::default();
    config.smart_push.max_diff_lines = 1000;
    let vcs = FakeVcs::with_changes(&["big.txt"], &added_lines(1500));
    let mut h = harness_with(vcs, config);

    let report = h.engine.execute(Mode::Push).unwrap();

    assert_eq!(report.status, CycleStatus::Blocked);
    assert_eq!(report.message, "Policy checks failed.");
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("1500"));
    assert!(report.errors[0].contains("1000"));
    assert_eq!(h.vcs.0.lock().unwrap().mutations, 0);
    assert!(report.snapshot.is_empty());
}

#[test]
fn plan_mode_never_mutates() {
    let vcs = FakeVcs::with_changes(&["a.py", "b.py", "README.md"], "+x\n");
    let mut h = harness(vcs);

    let report = h.engine.execute(Mode::Plan).unwrap();

    assert_eq!(report.status, CycleStatus::Planned);
    assert_eq!(report.message, "Plan generated (plan-only mode).");
    assert_eq!(report.plan.groups.len(), 2);
    assert_eq!(h.vcs.0.lock().unwrap().mutations, 0);
    assert!(report.commits.is_empty());
    assert!(report.tag.is_none());
}

#[test]
fn commit_mode_commits_each_group_and_tags() {
    let vcs = FakeVcs::with_changes(&["a.py", "b.py", "README.md"], "+x\n");
    let mut h = harness(vcs);
    fs::write(h.engine.root().join("a.py"), "print(1)\n").unwrap();

    let report = h.engine.execute(Mode::Commit).unwrap();

    assert_eq!(report.status, CycleStatus::Committed);
    assert_eq!(report.message, "Committed grouped changes.");
    assert_eq!(report.commits, vec!["Documentation Updates", "Python Changes"]);
    assert!(!report.pushed);

    let state = h.vcs.0.lock().unwrap();
    assert_eq!(state.commits[0].1, vec!["README.md"]);
    assert_eq!(state.commits[1].1, vec!["a.py", "b.py"]);
    assert!(state.pushes.is_empty());
    assert_eq!(state.tags.len(), 1);
    assert!(state.tags[0].0.starts_with("drafter-"));
    assert_eq!(state.tags[0].1, TAG_MESSAGE);
    assert_eq!(report.tag.as_deref(), Some(state.tags[0].0.as_str()));

    assert_eq!(report.snapshot.len(), 3);
    assert!(report.snapshot["a.py"].content_bytes().is_some());
}

#[test]
fn inert_groups_are_skipped_and_leftovers_caught() {
    let vcs = FakeVcs::with_changes(&["a.py", "notes.md"], "+x\n");
    vcs.0.lock().unwrap().inert.insert("notes.md".to_string());
    let mut h = harness(vcs);

    let report = h.engine.execute(Mode::Commit).unwrap();

    // notes.md stages to nothing in its own group and again as a leftover.
    assert_eq!(report.commits, vec!["Python Changes"]);
    assert_eq!(report.status, CycleStatus::Committed);
}

#[test]
fn state_directory_changes_are_ignored() {
    let vcs = FakeVcs::with_changes(&[".drafter/audit.jsonl"], "");
    let mut h = harness(vcs);
    let report = h.engine.execute(Mode::Push).unwrap();
    assert_eq!(report.status, CycleStatus::NoChanges);
}

#[test]
fn push_retries_with_upstream() {
    let vcs = FakeVcs::with_changes(&["a.py"], "+x\n");
    vcs.0.lock().unwrap().failing_pushes = 1;
    let mut h = harness(vcs);

    let report = h.engine.execute(Mode::Push).unwrap();

    assert_eq!(report.status, CycleStatus::Pushed);
    assert!(report.pushed);
    assert_eq!(report.message, "Changes pushed to remote.");
    let state = h.vcs.0.lock().unwrap();
    assert_eq!(
        state.pushes,
        vec![
            ("origin".to_string(), "HEAD:auto/dev".to_string(), false),
            ("origin".to_string(), "HEAD:auto/dev".to_string(), true),
        ]
    );
}

#[test]
fn push_failure_keeps_commits() {
    let vcs = FakeVcs::with_changes(&["a.py"], "+x\n");
    vcs.0.lock().unwrap().failing_pushes = 2;
    let mut h = harness(vcs);

    let report = h.engine.execute(Mode::Push).unwrap();

    assert_eq!(report.status, CycleStatus::CommitOnly);
    assert!(!report.pushed);
    assert_eq!(report.message, "Push failed; commits kept locally.");
    assert_eq!(report.commits.len(), 1);
}

#[test]
fn declined_push_is_commit_only() {
    let vcs = FakeVcs::with_changes(&["a.py"], "+x\n");
    let mut h = harness(vcs);

    let report = h
        .engine
        .execute_with(Mode::Push, &|report: &CycleReport| {
            assert_eq!(report.status, CycleStatus::Committed);
            false
        })
        .unwrap();

    assert_eq!(report.status, CycleStatus::CommitOnly);
    assert_eq!(report.message, "Push canceled by user.");
    assert!(h.vcs.0.lock().unwrap().pushes.is_empty());
}

/// Provider that always answers with the same plan.
struct FixedPlan(&'static str);

impl Adapter for FixedPlan {
    fn provider(&self) -> &'static str {
        "fixed"
    }

    fn generate(&self, _request: &LlmRequest) -> Result<String, AdapterError> {
        Ok(self.0.to_string())
    }
}

#[test]
fn files_missing_from_the_plan_get_a_catch_all_commit() {
    let vcs = FakeVcs::with_changes(&["a.py", "b.txt"], "+x\n");
    let dir = TempDir::new().unwrap();
    let mut config = DrafterConfig::default();
    config.branch = "auto/dev".to_string();
    let planner = Planner::new(Some(Box::new(FixedPlan(
        r#"{"groups":[{"title":"feat: add a","body":"Explains a.","files":["a.py"]}]}"#,
    ))));
    let mut engine = CycleEngine::new(dir.path(), config, Box::new(vcs.clone()), planner)
        .with_audit_path(dir.path().join("audit.jsonl"));

    let report = engine.execute(Mode::Commit).unwrap();

    assert_eq!(report.plan.source, PlanSource::Llm);
    assert_eq!(report.commits, vec!["feat: add a", CATCH_ALL_MESSAGE]);
    let state = vcs.0.lock().unwrap();
    assert_eq!(state.commits[0].0, "feat: add a\n\nExplains a.");
    assert_eq!(state.commits[1].1, vec!["b.txt"]);
}

#[test]
fn audit_line_matches_last_report() {
    let vcs = FakeVcs::with_changes(&["src/lib.rs"], "+x\n");
    let mut h = harness(vcs);

    let report = h.engine.execute(Mode::Commit).unwrap();
    let entry = log::latest::<CycleRecord>(&h.audit).unwrap().unwrap();

    assert_eq!(entry.record, report.record());
    assert_eq!(h.engine.last_report(), Some(&report));
    let by_tag = log::find::<CycleRecord>(&h.audit, report.tag.as_deref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(by_tag.record.commits, vec!["Src: Rust Changes"]);
}

#[test]
fn version_control_failures_abort_the_cycle() {
    for fail_commit in [true, false] {
        let vcs = FakeVcs::with_changes(&["a.py"], "diff --git a/a.py b/a.py\n+x\n");
        {
            let mut state = vcs.0.lock().unwrap();
            state.failing_commit = fail_commit;
            state.failing_stage = !fail_commit;
        }
        let mut h = harness(vcs);

        let err = h.engine.execute(Mode::Commit).unwrap_err();
        let expected = if fail_commit { "commit" } else { "add" };
        match err {
            CycleError::Vcs(VcsError::CommandFailed { command, .. }) => {
                assert_eq!(command, expected)
            }
            other => panic!("unexpected error: {other}"),
        }

        let state = h.vcs.0.lock().unwrap();
        assert!(state.commits.is_empty());
        assert!(state.tags.is_empty());
        assert!(state.pushes.is_empty());
        drop(state);
        assert!(h.engine.last_report().is_none());
    }
}
