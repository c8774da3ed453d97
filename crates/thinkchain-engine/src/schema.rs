//! Typed payloads validated at the parse boundary.
//!
//! The model's JSON is deserialized into loose `Raw*` shapes first, then
//! checked and narrowed into [`Framework`] and [`PhaseResult`]. Nothing past
//! this module sees unvalidated data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thinkchain_extraction::restore_newlines;
use thinkchain_utils::SchemaError;
use tracing::{debug, warn};

use crate::context::FRAMEWORK_KEY;
use crate::phase::{NextAction, Phase, PhaseResult, PhaseType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    CodeGeneration,
    CreativeWriting,
    Analysis,
    Other,
}

impl QueryType {
    /// Values outside the known set fold into `Other`
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("code_generation") => Self::CodeGeneration,
            Some("creative_writing") => Self::CreativeWriting,
            Some("analysis") => Self::Analysis,
            Some("other") | None => Self::Other,
            Some(unknown) => {
                debug!(query_type = unknown, "Unrecognized query_type, treating as other");
                Self::Other
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessCriteria {
    #[serde(default, alias = "overall_objective")]
    pub objective: String,
    #[serde(default)]
    pub quality_metrics: Vec<String>,
}

/// One phase as proposed by the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub phase_type: PhaseType,
    /// Requirement values are always strings
    pub requirements: Map<String, Value>,
}

/// The validated phase plan for a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Framework {
    pub query_type: QueryType,
    pub final_output_type: String,
    pub phases: Vec<PhaseSpec>,
    pub success_criteria: SuccessCriteria,
}

impl Framework {
    /// Validate a framework payload.
    ///
    /// # Errors
    ///
    /// - `SchemaError::Malformed` when required fields are missing or mistyped
    /// - `SchemaError::EmptyFramework` when no phases are proposed
    /// - `SchemaError::EmptyPhaseName`, `DuplicatePhase` or `ReservedPhaseName`
    ///   for unusable phase names
    pub fn from_payload(payload: &Map<String, Value>) -> Result<Self, SchemaError> {
        let raw: RawFramework = serde_json::from_value(Value::Object(payload.clone()))
            .map_err(|e| malformed("framework", e.to_string()))?;

        if raw.phases.is_empty() {
            return Err(SchemaError::EmptyFramework);
        }

        let mut seen = HashSet::new();
        let mut phases = Vec::with_capacity(raw.phases.len());
        for (index, spec) in raw.phases.into_iter().enumerate() {
            let name = spec.name.trim().to_string();
            if name.is_empty() {
                return Err(SchemaError::EmptyPhaseName { index: index + 1 });
            }
            if name == FRAMEWORK_KEY {
                return Err(SchemaError::ReservedPhaseName { name });
            }
            if !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicatePhase { name });
            }

            // Informational only: the final phase is always run as execution
            let phase_type = match spec.phase_type.as_deref().map(str::trim) {
                Some("execution") => PhaseType::Execution,
                Some("analysis") | None => PhaseType::Analysis,
                Some(other) => {
                    warn!(phase = %name, phase_type = other, "Unknown phase type, treating as analysis");
                    PhaseType::Analysis
                }
            };

            phases.push(PhaseSpec {
                name,
                phase_type,
                requirements: stringify_values(spec.requirements),
            });
        }

        Ok(Self {
            query_type: QueryType::parse(raw.query_type.as_deref()),
            final_output_type: raw.final_output_type.unwrap_or_default(),
            phases,
            success_criteria: raw.success_criteria.unwrap_or_default(),
        })
    }

    /// Fresh, pending phases in framework order
    #[must_use]
    pub fn instantiate_phases(&self) -> Vec<Phase> {
        self.phases
            .iter()
            .map(|spec| Phase::new(spec.name.clone(), spec.phase_type, spec.requirements.clone()))
            .collect()
    }

    /// Whether the plan ends with an execution phase. Not enforced.
    #[must_use]
    pub fn ends_with_execution(&self) -> bool {
        self.phases
            .last()
            .is_some_and(|p| p.phase_type == PhaseType::Execution)
    }
}

/// Validate a phase-output payload into a [`PhaseResult`].
///
/// Content is taken from `output`, else `analysis`, else empty, and has
/// literal `\n` sequences restored to line breaks.
///
/// # Errors
///
/// - `SchemaError::Malformed` when `quality_check` or `next_action` is missing
///   or mistyped
/// - `SchemaError::ScoreOutOfRange` for scores outside `0..=100`
/// - `SchemaError::UnknownAction` for an unrecognized `next_action`
pub fn parse_phase_output(payload: &Map<String, Value>) -> Result<PhaseResult, SchemaError> {
    let raw: RawPhaseOutput = serde_json::from_value(Value::Object(payload.clone()))
        .map_err(|e| malformed("phase_output", e.to_string()))?;

    let quality_score = parse_score(&raw.quality_check.score)?;
    let next_action: NextAction = raw.next_action.parse()?;

    let content = raw
        .output
        .or(raw.analysis)
        .map(|v| text_of(&v))
        .unwrap_or_default();

    Ok(PhaseResult {
        content: restore_newlines(&content),
        quality_score,
        issues: raw.quality_check.issues,
        suggestions: raw.quality_check.suggestions,
        next_action,
        conclusions: conclusions_of(raw.conclusions),
    })
}

/// `conclusions` is display-only, so any shape other than a string or a list
/// is dropped rather than failing the phase.
fn conclusions_of(value: Option<Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => vec![restore_newlines(&s)],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| restore_newlines(&text_of(item)))
            .collect(),
        Some(other) => {
            debug!(found = %other, "Ignoring conclusions that are neither text nor a list");
            Vec::new()
        }
    }
}

fn parse_score(value: &Value) -> Result<f64, SchemaError> {
    let score = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| malformed("phase_output", format!("quality_check.score is not a number: {value}")))?;

    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(SchemaError::ScoreOutOfRange { score });
    }
    Ok(score)
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => format!("{other:#}"),
    }
}

fn stringify_values(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(k, v)| {
            let text = text_of(&v);
            (k, Value::String(text))
        })
        .collect()
}

fn malformed(payload: &'static str, reason: String) -> SchemaError {
    SchemaError::Malformed { payload, reason }
}

#[derive(Debug, Deserialize)]
struct RawFramework {
    #[serde(default)]
    query_type: Option<String>,
    #[serde(default)]
    final_output_type: Option<String>,
    phases: Vec<RawPhaseSpec>,
    #[serde(default)]
    success_criteria: Option<SuccessCriteria>,
}

#[derive(Debug, Deserialize)]
struct RawPhaseSpec {
    name: String,
    #[serde(default, rename = "type")]
    phase_type: Option<String>,
    #[serde(default)]
    requirements: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawPhaseOutput {
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    analysis: Option<Value>,
    #[serde(default)]
    conclusions: Option<Value>,
    quality_check: RawQualityCheck,
    next_action: String,
}

#[derive(Debug, Deserialize)]
struct RawQualityCheck {
    score: Value,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test payloads are objects"),
        }
    }

    fn framework_payload() -> Map<String, Value> {
        object(json!({
            "query_type": "code_generation",
            "final_output_type": "a Rust function",
            "phases": [
                {"name": "Understand", "type": "analysis", "requirements": {"focus": "inputs", "depth": 2}},
                {"name": "Code Generation", "type": "execution", "requirements": {}}
            ],
            "success_criteria": {"objective": "working code", "quality_metrics": ["correctness"]}
        }))
    }

    #[test]
    fn test_framework_from_payload() {
        let fw = Framework::from_payload(&framework_payload()).unwrap();

        assert_eq!(fw.query_type, QueryType::CodeGeneration);
        assert_eq!(fw.final_output_type, "a Rust function");
        assert_eq!(fw.phases.len(), 2);
        assert_eq!(fw.phases[0].requirements["focus"], json!("inputs"));
        assert_eq!(fw.phases[0].requirements["depth"], json!("2"));
        assert!(fw.ends_with_execution());
        assert_eq!(fw.success_criteria.quality_metrics, ["correctness"]);

        let phases = fw.instantiate_phases();
        assert!(phases.iter().all(|p| p.attempt_count == 0 && p.result.is_none()));
    }

    #[test]
    fn test_unknown_query_type_is_other() {
        let mut payload = framework_payload();
        payload.insert("query_type".into(), json!("poetry"));
        assert_eq!(
            Framework::from_payload(&payload).unwrap().query_type,
            QueryType::Other
        );
    }

    #[test]
    fn test_framework_rejections() {
        let empty = object(json!({"phases": []}));
        assert_eq!(
            Framework::from_payload(&empty),
            Err(SchemaError::EmptyFramework)
        );

        let missing = object(json!({"query_type": "analysis"}));
        assert!(matches!(
            Framework::from_payload(&missing),
            Err(SchemaError::Malformed { payload: "framework", .. })
        ));

        let dup = object(json!({"phases": [{"name": "A"}, {"name": " A "}]}));
        assert_eq!(
            Framework::from_payload(&dup),
            Err(SchemaError::DuplicatePhase { name: "A".into() })
        );

        let reserved = object(json!({"phases": [{"name": "framework"}]}));
        assert!(matches!(
            Framework::from_payload(&reserved),
            Err(SchemaError::ReservedPhaseName { .. })
        ));

        let blank = object(json!({"phases": [{"name": "A"}, {"name": ""}]}));
        assert_eq!(
            Framework::from_payload(&blank),
            Err(SchemaError::EmptyPhaseName { index: 2 })
        );

        let not_a_list = object(json!({"phases": "A then B"}));
        assert!(matches!(
            Framework::from_payload(&not_a_list),
            Err(SchemaError::Malformed { .. })
        ));
    }

    #[test]
    fn test_unknown_phase_type_reads_as_analysis() {
        let payload = object(json!({
            "phases": [{"name": "A", "type": "analysis|execution"}],
            "success_criteria": {"overall_objective": "clarity"}
        }));
        let fw = Framework::from_payload(&payload).unwrap();
        assert_eq!(fw.phases[0].phase_type, PhaseType::Analysis);
        assert_eq!(fw.success_criteria.objective, "clarity");
    }

    #[test]
    fn test_framework_without_execution_phase_is_accepted() {
        let payload = object(json!({"phases": [{"name": "Only", "type": "analysis"}]}));
        let fw = Framework::from_payload(&payload).unwrap();
        assert!(!fw.ends_with_execution());
    }

    #[test]
    fn test_parse_phase_output_prefers_output() {
        let payload = object(json!({
            "analysis": "thinking",
            "output": "line one\\nline two",
            "conclusions": ["done"],
            "quality_check": {"score": 88, "issues": [], "suggestions": ["more tests"]},
            "next_action": "proceed"
        }));
        let result = parse_phase_output(&payload).unwrap();

        assert_eq!(result.content, "line one\nline two");
        assert_eq!(result.quality_score, 88.0);
        assert_eq!(result.suggestions, ["more tests"]);
        assert_eq!(result.next_action, NextAction::Proceed);
        assert_eq!(result.conclusions, ["done"]);
    }

    #[test]
    fn test_conclusions_accept_a_single_string() {
        let payload = object(json!({
            "output": "answer",
            "conclusions": "one big conclusion",
            "quality_check": {"score": 92},
            "next_action": "proceed"
        }));
        let result = parse_phase_output(&payload).unwrap();

        assert_eq!(result.quality_score, 92.0);
        assert_eq!(result.next_action, NextAction::Proceed);
        assert_eq!(result.conclusions, ["one big conclusion"]);
    }

    #[test]
    fn test_misshapen_conclusions_are_dropped() {
        let payload = object(json!({
            "output": "answer",
            "conclusions": {"summary": "nested"},
            "quality_check": {"score": 92},
            "next_action": "proceed"
        }));
        let result = parse_phase_output(&payload).unwrap();

        assert!(result.conclusions.is_empty());
        assert_eq!(result.content, "answer");
    }

    #[test]
    fn test_parse_phase_output_falls_back_to_analysis() {
        let payload = object(json!({
            "analysis": "just analysis",
            "quality_check": {"score": "72.5"},
            "next_action": "recurse"
        }));
        let result = parse_phase_output(&payload).unwrap();
        assert_eq!(result.content, "just analysis");
        assert_eq!(result.quality_score, 72.5);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_parse_phase_output_rejections() {
        let out_of_range = object(json!({
            "analysis": "a", "quality_check": {"score": 101}, "next_action": "proceed"
        }));
        assert_eq!(
            parse_phase_output(&out_of_range),
            Err(SchemaError::ScoreOutOfRange { score: 101.0 })
        );

        let negative = object(json!({
            "analysis": "a", "quality_check": {"score": -1}, "next_action": "proceed"
        }));
        assert!(matches!(
            parse_phase_output(&negative),
            Err(SchemaError::ScoreOutOfRange { .. })
        ));

        let unknown_action = object(json!({
            "analysis": "a", "quality_check": {"score": 90}, "next_action": "stop"
        }));
        assert!(matches!(
            parse_phase_output(&unknown_action),
            Err(SchemaError::UnknownAction { .. })
        ));

        let missing_check = object(json!({"analysis": "a", "next_action": "proceed"}));
        assert!(matches!(
            parse_phase_output(&missing_check),
            Err(SchemaError::Malformed { payload: "phase_output", .. })
        ));

        let bad_score = object(json!({
            "analysis": "a", "quality_check": {"score": "high"}, "next_action": "proceed"
        }));
        assert!(matches!(
            parse_phase_output(&bad_score),
            Err(SchemaError::Malformed { .. })
        ));
    }
}
