/// Build the framework discovery prompt for `query`.
///
/// The model is asked to classify the query and propose an ordered list of
/// phases inside a `<framework>` block. `query` may already carry
/// conversation history; code in that history is wrapped in `<CODE>` tags.
#[must_use]
pub fn framework_prompt(query: &str) -> String {
    format!(
        r#"Analyze the following query and design a thinking framework.
The framework MUST include analysis phases followed by an execution phase.
The execution phase should focus on producing the actual requested output (code, story, etc.).
Note: Code blocks in the conversation history are wrapped in <CODE> tags.

Query: {query}

Guidelines:
1. Analyze if this query requires:
   - Code generation
   - Creative writing
   - Analysis report
   - Other specific output

2. Design appropriate analysis phases

3. ALWAYS end with an execution phase that produces the requested output

Required format:
<framework>
{{
    "query_type": "code_generation|creative_writing|analysis|other",
    "final_output_type": "description of what needs to be produced",
    "phases": [
        {{
            "name": "phase_name",
            "type": "analysis|execution",
            "requirements": {{
                "input": "what is needed as input",
                "objective": "what this phase should achieve",
                "success_criteria": "what determines success"
            }}
        }}
    ],
    "success_criteria": {{
        "overall_objective": "main goal to achieve",
        "quality_metrics": ["list of quality metrics"]
    }}
}}
</framework>

Example:
For a code generation query, the last phase should be "Code Generation"
For a story writing query, the last phase should be "Story Creation"
For an analysis query, the last phase should be "Final Report Generation"
"#
    )
}
