use serde_json::{Map, Value};

use crate::{FORMAT_FOOTER, PhaseKind, pretty};

/// Build the prompt asking the model to improve a low-scoring result.
///
/// The response schema matches the phase template named by `kind`, so an
/// improved execution result still carries its deliverable under `output`.
#[must_use]
pub fn improvement_prompt(
    kind: PhaseKind,
    content: &str,
    score: f64,
    issues: &[String],
    suggestions: &[String],
    requirements: &Map<String, Value>,
) -> String {
    let issues_text = if issues.is_empty() {
        "No specific issues identified.".to_string()
    } else {
        bullet_list(issues)
    };
    let suggestions_text = if suggestions.is_empty() {
        "No specific suggestions provided.".to_string()
    } else {
        bullet_list(suggestions)
    };

    let schema = match kind {
        PhaseKind::Analysis => {
            r#"    "analysis": "your improved analysis",
    "conclusions": ["your improved conclusions"],"#
        }
        PhaseKind::Execution => {
            r#"    "analysis": "brief summary of what changed",
    "output": "your improved implementation/creation/output","#
        }
    };

    format!(
        r#"Please improve the previous analysis based on the following suggestions and issues:

Previous Analysis:
{content}

Quality Score: {score}

Issues to Address:
{issues_text}

Suggestions for Improvement:
{suggestions_text}

Original Requirements:
{requirements}

Please provide an improved response that addresses these points and aims for a higher quality score.
Use the same output format as before:

<phase_output>
{{
{schema}
    "quality_check": {{
        "score": 0-100,
        "issues": ["any remaining issues"],
        "suggestions": ["any additional suggestions"]
    }},
    "next_action": "proceed|recurse|revise"
}}
</phase_output>
{FORMAT_FOOTER}"#,
        requirements = pretty(requirements),
    )
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_issues_and_suggestions() {
        let prompt = improvement_prompt(
            PhaseKind::Execution,
            "fn main() {}",
            70.0,
            &["no tests".to_string()],
            &["add tests".to_string(), "add docs".to_string()],
            &Map::new(),
        );
        assert!(prompt.contains("Previous Analysis:\nfn main() {}\n"));
        assert!(prompt.contains("Quality Score: 70\n"));
        assert!(prompt.contains("Issues to Address:\n- no tests\n"));
        assert!(prompt.contains("- add tests\n- add docs"));
        assert!(prompt.contains("\"output\""));
        assert!(prompt.contains("<phase_output>"));
    }

    #[test]
    fn test_empty_issues_placeholder() {
        let prompt = improvement_prompt(PhaseKind::Analysis, "x", 82.5, &[], &[], &Map::new());
        assert!(prompt.contains("No specific issues identified."));
        assert!(prompt.contains("Quality Score: 82.5"));
        assert!(prompt.contains("\"conclusions\""));
    }
}
