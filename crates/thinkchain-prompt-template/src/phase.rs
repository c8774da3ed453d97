use serde_json::{Map, Value};

use crate::{FORMAT_FOOTER, pretty};

/// Which template a phase is rendered with.
///
/// The last phase of a framework is always rendered as `Execution`
/// regardless of the `type` the model gave it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Analysis,
    Execution,
}

/// Inputs for a phase prompt
#[derive(Debug, Clone, Copy)]
pub struct PhasePrompt<'a> {
    pub name: &'a str,
    pub requirements: &'a Map<String, Value>,
    /// Context entries from earlier phases, in insertion order. Must not
    /// contain the phase's own entry.
    pub previous_results: &'a [(String, String)],
    pub original_query: &'a str,
}

impl PhasePrompt<'_> {
    fn previous_json(&self) -> String {
        let map: Map<String, Value> = self
            .previous_results
            .iter()
            .map(|(name, content)| (name.clone(), Value::String(content.clone())))
            .collect();
        pretty(&map)
    }
}

/// Render the prompt for one phase attempt, including the format footer.
#[must_use]
pub fn phase_prompt(kind: PhaseKind, input: &PhasePrompt<'_>) -> String {
    let base = match kind {
        PhaseKind::Analysis => analysis_prompt(input),
        PhaseKind::Execution => execution_prompt(input),
    };
    base + FORMAT_FOOTER
}

fn analysis_prompt(input: &PhasePrompt<'_>) -> String {
    format!(
        r#"Execute the following analysis phase:

Phase: {name}
Requirements: {requirements}
Previous Results: {previous}
Original Query: {query}

Please format your response as follows:
<phase_output>
{{
    "analysis": "your detailed analysis",
    "conclusions": ["key conclusions"],
    "quality_check": {{
        "score": 0-100,
        "issues": ["any issues found"],
        "suggestions": ["improvement suggestions"]
    }},
    "next_action": "proceed|recurse|revise"
}}
</phase_output>
"#,
        name = input.name,
        requirements = pretty(input.requirements),
        previous = input.previous_json(),
        query = input.original_query,
    )
}

fn execution_prompt(input: &PhasePrompt<'_>) -> String {
    format!(
        r#"This is the EXECUTION phase. Based on all previous analyses, please produce the final output as requested in the original query.

Phase: {name}
Original Query: {query}

Previous Analyses:
{previous}

Requirements: {requirements}

IMPORTANT: Your response should focus on producing the actual requested output (code, story, etc.), not just analysis. Deliver the product itself, not commentary about it.

Please format your response as follows:
<phase_output>
{{
    "analysis": "brief execution summary",
    "output": "your actual implementation/creation/output",
    "quality_check": {{
        "score": 0-100,
        "issues": ["any issues found"],
        "suggestions": ["improvement suggestions"]
    }},
    "next_action": "proceed|recurse|revise"
}}
</phase_output>
"#,
        name = input.name,
        query = input.original_query,
        previous = input.previous_json(),
        requirements = pretty(input.requirements),
    )
}
