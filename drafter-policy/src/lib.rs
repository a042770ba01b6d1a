//! Safety gate run over a cycle's diff before anything is committed.
//!
//! [`run_checks`] never fails: problems become [`PolicyMessage`]s on the
//! returned [`PolicyResult`]. Errors block the cycle, warnings do not.
//!
//! [`PolicyMessage`]: drafter_core::PolicyMessage

use regex::Regex;

use drafter_core::{DrafterConfig, PolicyResult, Severity};

pub const DEFAULT_LARGE_FILE_THRESHOLD: usize = 500;

/// Shown length of a pattern in a secret finding before it is elided.
const PATTERN_DISPLAY_LEN: usize = 50;

pub const BUILTIN_SECRET_PATTERNS: &[&str] = &[
    r#"(?i)(api[_-]?key|secret|token)\s*[:=]\s*["'][A-Za-z0-9\-_/]{12,}["']"#,
    r"AKIA[0-9A-Z]{16}",
    r#"(?i)password\s*[:=]\s*["'][^"']{8,}["']"#,
    r"(?i)(bearer|auth)\s+[A-Za-z0-9\-_\.]{20,}",
    r#"(?i)(github|gitlab|bitbucket)[_-]?(token|key)\s*[:=]\s*["'][A-Za-z0-9\-_]{20,}["']"#,
    r"(?i)private[_-]?key\s*[:=]",
];

/// Everything the gate looks at for one cycle.
#[derive(Debug, Clone)]
pub struct PolicyInput<'a> {
    pub diff_text: &'a str,
    pub diff_line_limit: usize,
    pub secret_scan: bool,
    pub secret_patterns: &'a [String],
    pub protected_branches: &'a [String],
    pub current_branch: &'a str,
    pub large_file_threshold: usize,
}

impl<'a> PolicyInput<'a> {
    pub fn from_config(config: &'a DrafterConfig, diff_text: &'a str, branch: &'a str) -> Self {
        Self {
            diff_text,
            diff_line_limit: config.smart_push.max_diff_lines,
            secret_scan: config.secret_scan,
            secret_patterns: &config.secret_patterns,
            protected_branches: &config.protected_branches,
            current_branch: branch,
            large_file_threshold: config.large_file_threshold,
        }
    }
}

pub fn run_checks(input: &PolicyInput<'_>) -> PolicyResult {
    let mut result = PolicyResult::default();

    if input.secret_scan {
        for pattern in secret_findings(input.diff_text, input.secret_patterns) {
            result.add(
                Severity::Error,
                format!("Secret pattern detected: {}", display_pattern(&pattern)),
            );
        }
    }

    let diff_lines = count_diff_lines(input.diff_text);
    if diff_lines > input.diff_line_limit {
        result.add(
            Severity::Error,
            format!(
                "Diff adds/removes {diff_lines} lines (limit {}).",
                input.diff_line_limit
            ),
        );
    }

    if input
        .protected_branches
        .iter()
        .any(|b| b == input.current_branch)
    {
        result.add(
            Severity::Warning,
            format!(
                "Branch '{}' is protected. Auto-push will be skipped.",
                input.current_branch
            ),
        );
    }

    for (path, lines) in per_file_line_counts(input.diff_text) {
        if lines > input.large_file_threshold {
            result.add(
                Severity::Warning,
                format!(
                    "Large diff in {path}: {lines} lines (threshold {})",
                    input.large_file_threshold
                ),
            );
        }
    }

    result
}

/// Source text of every pattern with at least one match, built-ins first.
pub fn secret_findings(diff_text: &str, custom: &[String]) -> Vec<String> {
    compile_patterns(custom)
        .into_iter()
        .filter(|re| re.is_match(diff_text))
        .map(|re| re.as_str().to_string())
        .collect()
}

fn compile_patterns(custom: &[String]) -> Vec<Regex> {
    BUILTIN_SECRET_PATTERNS
        .iter()
        .copied()
        .chain(custom.iter().map(String::as_str))
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(err) => {
                tracing::warn!(pattern, error = %err, "dropping invalid secret pattern");
                None
            }
        })
        .collect()
}

fn display_pattern(pattern: &str) -> String {
    if pattern.chars().count() > PATTERN_DISPLAY_LEN {
        let head: String = pattern.chars().take(PATTERN_DISPLAY_LEN).collect();
        format!("{head}...")
    } else {
        pattern.to_string()
    }
}

fn is_change_line(line: &str) -> bool {
    (line.starts_with('+') && !line.starts_with("+++"))
        || (line.starts_with('-') && !line.starts_with("---"))
}

/// Added plus removed lines, ignoring `+++`/`---` file headers.
pub fn count_diff_lines(diff_text: &str) -> usize {
    diff_text.lines().filter(|line| is_change_line(line)).count()
}

/// Changed-line counts per file, in order of first appearance.
///
/// Lines are attributed to the most recent `diff --git a/<x> b/<y>` header;
/// lines before any header are not counted.
pub fn per_file_line_counts(diff_text: &str) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut current: Option<usize> = None;

    for line in diff_text.lines() {
        if let Some(header) = line.strip_prefix("diff --git ") {
            let path = header
                .rsplit_once(" b/")
                .map(|(_, b)| b)
                .unwrap_or(header)
                .to_string();
            current = Some(match counts.iter().position(|(p, _)| *p == path) {
                Some(idx) => idx,
                None => {
                    counts.push((path, 0));
                    counts.len() - 1
                }
            });
            continue;
        }
        if let Some(idx) = current {
            if is_change_line(line) {
                counts[idx].1 += 1;
            }
        }
    }
    counts
}
