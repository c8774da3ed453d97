//! Run outcome records handed back to hosts

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Write as _;

use crate::phase::{Phase, PhaseResult, PhaseStatus};
use crate::schema::Framework;

/// Snapshot of one executed phase
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseOutcome {
    pub name: String,
    pub requirements: Map<String, Value>,
    pub status: PhaseStatus,
    pub attempt_count: u32,
    pub result: Option<PhaseResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl From<&Phase> for PhaseOutcome {
    fn from(phase: &Phase) -> Self {
        Self {
            name: phase.name.clone(),
            requirements: phase.requirements.clone(),
            status: phase.status,
            attempt_count: phase.attempt_count,
            result: phase.result.clone(),
            failure: phase.failure.clone(),
        }
    }
}

/// Everything a run produced: the framework and the outcomes of the phases
/// that were executed, in order, up to and including the first failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub query: String,
    pub framework: Framework,
    pub outcomes: Vec<PhaseOutcome>,
}

impl RunReport {
    /// Every planned phase ran and completed
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcomes.len() == self.framework.phases.len()
            && self
                .outcomes
                .iter()
                .all(|o| o.status == PhaseStatus::Complete)
    }

    /// The first failed phase, if any
    #[must_use]
    pub fn failed_phase(&self) -> Option<&PhaseOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.status == PhaseStatus::Failed)
    }

    /// Content of the final phase when it has a result
    #[must_use]
    pub fn final_output(&self) -> Option<&str> {
        if self.outcomes.len() != self.framework.phases.len() {
            return None;
        }
        self.outcomes
            .last()
            .and_then(|o| o.result.as_ref())
            .map(|r| r.content.as_str())
    }

    /// Human-readable rendering of every outcome
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let total = self.framework.phases.len();

        for (index, outcome) in self.outcomes.iter().enumerate() {
            let _ = writeln!(out, "=== Phase {}/{}: {} ===", index + 1, total, outcome.name);
            let _ = writeln!(
                out,
                "Status: {} (attempts: {})",
                outcome.status, outcome.attempt_count
            );

            if let Some(result) = &outcome.result {
                let _ = writeln!(out, "Quality score: {}", result.quality_score);
                let _ = writeln!(out, "\n{}", result.content.trim_end());
                write_list(&mut out, "Conclusions", &result.conclusions);
                write_list(&mut out, "Issues", &result.issues);
                write_list(&mut out, "Suggestions", &result.suggestions);
            }
            if let Some(failure) = &outcome.failure {
                let _ = writeln!(out, "Failure: {failure}");
            }
            out.push('\n');
        }

        if self.outcomes.len() < total {
            let _ = writeln!(
                out,
                "Stopped after {} of {} phases.",
                self.outcomes.len(),
                total
            );
        }
        out
    }
}

fn write_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}:");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
}
