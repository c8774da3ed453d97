//! Thinking-chain engine
//!
//! Asks a model to plan a query as an ordered list of phases, then executes
//! each phase as its own model call. Every attempt's structured payload is
//! extracted, validated and put through a quality gate that completes,
//! re-executes (bounded) or fails the phase. Completed phases feed their
//! content to every later phase's prompt.

mod context;
mod engine;
mod phase;
mod report;
mod schema;
mod settings;

pub use context::{FRAMEWORK_KEY, RunContext};
pub use engine::Engine;
pub use phase::{
    NextAction, Phase, PhaseResult, PhaseStatus, PhaseType, Verdict, quality_gate,
    wants_improvement,
};
pub use report::{PhaseOutcome, RunReport};
pub use schema::{Framework, PhaseSpec, QueryType, SuccessCriteria, parse_phase_output};
pub use settings::EngineSettings;
