//! Prompt rendering for plan refinement.

use serde::Serialize;
use tera::{Context, Tera};

use drafter_core::GroupPlan;

const PROMPT_TEMPLATE: &str = "Files changed:
{% for file in files %}- {{ file }}
{% endfor %}
Proposed groups:
{{ heuristic_plan }}";

#[derive(Serialize)]
struct HeuristicPlan<'a> {
    groups: &'a [GroupPlan],
}

/// Render the user prompt: the file list followed by the heuristic plan as pretty JSON.
pub(crate) fn render(files: &[String], heuristic: &[GroupPlan]) -> Result<String, tera::Error> {
    let plan = serde_json::to_string_pretty(&HeuristicPlan { groups: heuristic })
        .map_err(|e| tera::Error::msg(format!("heuristic plan serialization failed: {e}")))?;

    let mut ctx = Context::new();
    ctx.insert("files", files);
    ctx.insert("heuristic_plan", &plan);
    Tera::one_off(PROMPT_TEMPLATE, &ctx, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_files_then_plan() {
        let files = vec!["a.py".to_string(), "docs/<intro>.md".to_string()];
        let groups = vec![GroupPlan::new("Python Changes", vec!["a.py".to_string()])];
        let prompt = render(&files, &groups).unwrap();

        assert!(prompt.starts_with("Files changed:\n- a.py\n- docs/<intro>.md\n\nProposed groups:\n{"));
        assert!(prompt.contains("\"title\": \"Python Changes\""));
    }
}
