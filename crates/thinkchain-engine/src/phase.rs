//! Phase state and the quality gate that drives its transitions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thinkchain_utils::SchemaError;

use crate::settings::EngineSettings;

/// Kind of phase as proposed by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseType {
    Analysis,
    Execution,
}

/// Lifecycle of a phase within one run.
///
/// `Pending → InProgress → {Complete | NeedRevision | Failed}`;
/// `NeedRevision` loops back to `InProgress` while attempts remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    InProgress,
    Complete,
    NeedRevision,
    Failed,
}

impl PhaseStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
            Self::NeedRevision => "need_revision",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the model asks the engine to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextAction {
    Proceed,
    Recurse,
    Revise,
    Complete,
}

impl NextAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proceed => "proceed",
            Self::Recurse => "recurse",
            Self::Revise => "revise",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NextAction {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proceed" => Ok(Self::Proceed),
            "recurse" => Ok(Self::Recurse),
            "revise" => Ok(Self::Revise),
            "complete" => Ok(Self::Complete),
            _ => Err(SchemaError::UnknownAction {
                value: s.to_string(),
            }),
        }
    }
}

/// Validated output of one phase attempt. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseResult {
    /// Analysis text or final deliverable, with line breaks restored
    pub content: String,
    /// Self-reported score in `0..=100`
    pub quality_score: f64,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub next_action: NextAction,
    pub conclusions: Vec<String>,
}

/// Outcome of applying the quality gate to one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Complete,
    Revise,
    Fail,
}

/// Decide the transition for an attempt.
///
/// `attempt_count` is the number of attempts made so far, this one included.
#[must_use]
pub fn quality_gate(result: &PhaseResult, attempt_count: u32, settings: &EngineSettings) -> Verdict {
    if result.quality_score >= settings.pass_score && result.next_action == NextAction::Proceed {
        Verdict::Complete
    } else if result.next_action == NextAction::Recurse && attempt_count < settings.max_attempts {
        Verdict::Revise
    } else {
        Verdict::Fail
    }
}

/// Whether the best-effort improvement pass should run for a final-phase result
#[must_use]
pub fn wants_improvement(result: &PhaseResult, attempt_count: u32, settings: &EngineSettings) -> bool {
    result.quality_score < settings.improvement_threshold
        && attempt_count < settings.max_improvement_attempts
}

/// One named unit of work, created from the framework before execution and
/// mutated in place by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    pub name: String,
    pub phase_type: PhaseType,
    /// Fixed at creation
    pub requirements: Map<String, Value>,
    pub status: PhaseStatus,
    pub attempt_count: u32,
    /// Set only when an attempt's payload parsed and validated
    pub result: Option<PhaseResult>,
    /// Why the phase failed, when it did
    pub failure: Option<String>,
}

impl Phase {
    #[must_use]
    pub fn new(name: impl Into<String>, phase_type: PhaseType, requirements: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            phase_type,
            requirements,
            status: PhaseStatus::Pending,
            attempt_count: 0,
            result: None,
            failure: None,
        }
    }

    /// Enter a new attempt
    pub(crate) fn begin_attempt(&mut self) -> u32 {
        self.status = PhaseStatus::InProgress;
        self.attempt_count += 1;
        self.attempt_count
    }

    pub(crate) fn fail(&mut self, reason: impl Into<String>) {
        self.status = PhaseStatus::Failed;
        self.failure = Some(reason.into());
    }

    /// Record a parsed result and apply the quality gate to it
    pub(crate) fn settle(&mut self, result: PhaseResult, settings: &EngineSettings) -> Verdict {
        let verdict = quality_gate(&result, self.attempt_count, settings);
        match verdict {
            Verdict::Complete => self.status = PhaseStatus::Complete,
            Verdict::Revise => self.status = PhaseStatus::NeedRevision,
            Verdict::Fail => self.fail(format!(
                "quality gate rejected attempt {}/{}: score {}, next_action {}",
                self.attempt_count, settings.max_attempts, result.quality_score, result.next_action
            )),
        }
        self.result = Some(result);
        verdict
    }
}
