//! Plan building with optional provider refinement.

use serde_json::Value;

use drafter_core::{GroupPlan, PlanResult, PlanSource};

use crate::adapter::{Adapter, LlmRequest};
use crate::error::RefineError;
use crate::heuristic::heuristic_groups;
use crate::prompt;

pub const SYSTEM_PROMPT: &str = "You are drafter, a tool that prepares commit plans.
Group the provided file paths into logical commits. Respond as JSON:
{\"groups\":[{\"title\":\"\",\"body\":\"\",\"files\":[]}]}";

pub struct Planner {
    adapter: Option<Box<dyn Adapter>>,
}

impl Planner {
    pub fn new(adapter: Option<Box<dyn Adapter>>) -> Self {
        Self { adapter }
    }

    pub fn heuristic_only() -> Self {
        Self { adapter: None }
    }

    pub fn provider(&self) -> Option<&'static str> {
        self.adapter.as_ref().map(|a| a.provider())
    }

    /// Group `files` into commits. Never fails; refinement problems fall back to heuristics.
    pub fn build_plan(&self, files: &[String]) -> PlanResult {
        if files.is_empty() {
            return PlanResult::empty();
        }

        let heuristic = heuristic_groups(files);
        let Some(adapter) = self.adapter.as_deref() else {
            return PlanResult::heuristic(heuristic);
        };

        match refine(adapter, files, &heuristic) {
            Ok((groups, raw)) => {
                tracing::debug!(provider = adapter.provider(), groups = groups.len(), "plan refined");
                PlanResult {
                    groups,
                    source: PlanSource::Llm,
                    raw_response: Some(raw),
                }
            }
            Err(err) => {
                tracing::warn!(
                    provider = adapter.provider(),
                    error = %err,
                    "plan refinement failed, using heuristic groups",
                );
                PlanResult::heuristic(heuristic)
            }
        }
    }
}

fn refine(
    adapter: &dyn Adapter,
    files: &[String],
    heuristic: &[GroupPlan],
) -> Result<(Vec<GroupPlan>, String), RefineError> {
    let request = LlmRequest {
        prompt: prompt::render(files, heuristic)?,
        system: Some(SYSTEM_PROMPT.to_string()),
    };
    let raw = adapter.generate(&request)?;
    let groups = parse_groups(&raw)?;
    Ok((groups, raw))
}

/// Parse a provider answer of the form `{"groups":[{"title","body","files"}]}`.
///
/// Markdown code fences around the JSON are tolerated.
pub fn parse_groups(raw: &str) -> Result<Vec<GroupPlan>, RefineError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))?;
    let entries = value
        .get("groups")
        .and_then(Value::as_array)
        .ok_or(RefineError::GroupsNotList)?;
    if entries.is_empty() {
        return Err(RefineError::NoGroups);
    }

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| -> Result<GroupPlan, RefineError> {
            let files = entry
                .get("files")
                .and_then(Value::as_array)
                .ok_or(RefineError::MissingFiles { index })?
                .iter()
                .map(|f| f.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or(RefineError::MissingFiles { index })?;
            let text = |key: &str| {
                entry
                    .get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            Ok(GroupPlan {
                title: text("title"),
                body: text("body"),
                files,
            })
        })
        .collect()
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().trim_end_matches("```").trim()
}
