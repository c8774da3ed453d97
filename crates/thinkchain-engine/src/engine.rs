//! The thinking-chain engine.
//!
//! One run: ask the model for a framework, then execute its phases strictly
//! in order. Each phase attempt is one model call whose payload passes the
//! quality gate, is retried (bounded by `max_attempts`), or fails the phase.
//! The final phase may get one best-effort improvement call.

use std::sync::Arc;
use std::time::Instant;

use thinkchain_extraction::{Delimiters, extract_payload};
use thinkchain_llm::{LlmBackend, LlmInvocation};
use thinkchain_prompt_template::{
    PhaseKind, PhasePrompt, framework_prompt, improvement_prompt, phase_prompt,
};
use thinkchain_utils::ChainError;
use thinkchain_utils::logging::{log_phase_complete, log_phase_error, log_phase_start, phase_span};
use tracing::{Instrument, debug, error, info, warn};

use crate::context::{FRAMEWORK_KEY, RunContext};
use crate::phase::{Phase, PhaseResult, PhaseStatus, Verdict, wants_improvement};
use crate::report::{PhaseOutcome, RunReport};
use crate::schema::{Framework, parse_phase_output};
use crate::settings::EngineSettings;

/// Drives one run at a time.
///
/// Every operation takes `&mut self`, so an engine cannot serve two runs
/// concurrently; hosts running queries in parallel use one engine each.
pub struct Engine {
    backend: Arc<dyn LlmBackend>,
    settings: EngineSettings,
    original_query: String,
    framework: Option<Framework>,
    phases: Vec<Phase>,
    context: RunContext,
}

impl Engine {
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>, settings: EngineSettings) -> Self {
        Self {
            backend,
            settings,
            original_query: String::new(),
            framework: None,
            phases: Vec::new(),
            context: RunContext::new(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub fn framework(&self) -> Option<&Framework> {
        self.framework.as_ref()
    }

    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    #[must_use]
    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Ask the model for a framework and materialize its phases, returning
    /// the validated framework.
    ///
    /// Resets all per-run state first. There is no retry here: any failure
    /// leaves the engine without phases.
    ///
    /// # Errors
    ///
    /// Returns the model call's `LlmError`, an `ExtractionError` when the
    /// framework block cannot be recovered, or a `SchemaError` when it does
    /// not validate.
    pub async fn init_framework(&mut self, query: &str) -> Result<&Framework, ChainError> {
        self.reset(query);

        let prompt = framework_prompt(query);
        let response = self.call(FRAMEWORK_KEY, prompt).await?;
        let payload = extract_payload(&response, &Delimiters::FRAMEWORK)?;
        let framework = Framework::from_payload(&payload)?;

        if !framework.ends_with_execution() {
            warn!(
                phases = framework.phases.len(),
                "Framework does not end with an execution phase; the last phase will be asked for the deliverable"
            );
        }
        info!(
            query_type = ?framework.query_type,
            phases = framework.phases.len(),
            "Framework initialized"
        );

        self.phases = framework.instantiate_phases();
        self.context.record_framework(&payload);
        Ok(self.framework.insert(framework))
    }

    /// Execute the phase at `index` until it completes or fails.
    ///
    /// Returns `true` when the phase completed. A completed phase's content is
    /// appended to the run context under its name. When `index` is the final
    /// phase and its result qualifies, one improvement call follows.
    pub async fn execute_phase(&mut self, index: usize) -> bool {
        let Some(name) = self.phases.get(index).map(|p| p.name.clone()) else {
            error!(index, "No phase at this index");
            return false;
        };
        let is_last = index + 1 == self.phases.len();
        let kind = if is_last {
            PhaseKind::Execution
        } else {
            PhaseKind::Analysis
        };
        let started = Instant::now();

        let completed = loop {
            let attempt = self.phases[index].begin_attempt();
            let prompt = self.render_phase_prompt(index, kind);

            let parsed = self
                .call_for_result(&name, prompt)
                .instrument(phase_span(&name, attempt))
                .await;

            let phase = &mut self.phases[index];
            match parsed {
                Ok(result) => match phase.settle(result, &self.settings) {
                    Verdict::Complete => break true,
                    Verdict::Revise => {
                        debug!(phase = %name, attempt, "Phase asked to recurse; re-executing");
                    }
                    Verdict::Fail => break false,
                },
                Err(err) => {
                    phase.fail(err.to_string());
                    break false;
                }
            }
        };

        if is_last {
            self.improve(index).await;
        }

        let phase = &self.phases[index];
        let elapsed = started.elapsed().as_millis();
        if completed {
            let result = phase.result.as_ref();
            log_phase_complete(&name, result.map_or(0.0, |r| r.quality_score), elapsed);
            if let Some(result) = result
                && !self.context.append(name.clone(), result.content.clone())
            {
                warn!(phase = %name, "Context already holds an entry for this phase");
            }
        } else {
            log_phase_error(&name, phase.failure.as_deref().unwrap_or("unknown"), elapsed);
        }
        completed
    }

    /// Run the whole chain for `query`.
    ///
    /// Phases run in order; the first failed phase stops the run. The report
    /// holds the outcomes of every phase that was executed, the failed one
    /// included.
    ///
    /// # Errors
    ///
    /// Only framework initialization failures are errors; phase failures are
    /// reported through the outcomes.
    pub async fn run(&mut self, query: &str) -> Result<RunReport, ChainError> {
        let framework = self.init_framework(query).await?.clone();

        let total = self.phases.len();
        for index in 0..total {
            log_phase_start(&self.phases[index].name, index, total);
            if !self.execute_phase(index).await {
                error!(
                    phase = %self.phases[index].name,
                    "Phase failed; remaining phases skipped"
                );
                break;
            }
        }

        Ok(RunReport {
            query: self.original_query.clone(),
            framework,
            outcomes: self.outcomes(),
        })
    }

    /// Outcomes of the phases executed so far
    #[must_use]
    pub fn outcomes(&self) -> Vec<PhaseOutcome> {
        self.phases
            .iter()
            .filter(|p| p.status != PhaseStatus::Pending)
            .map(PhaseOutcome::from)
            .collect()
    }

    /// Report for the current run, once a framework exists
    #[must_use]
    pub fn report(&self) -> Option<RunReport> {
        let framework = self.framework.clone()?;
        Some(RunReport {
            query: self.original_query.clone(),
            framework,
            outcomes: self.outcomes(),
        })
    }

    fn reset(&mut self, query: &str) {
        self.original_query = query.to_string();
        self.framework = None;
        self.phases.clear();
        self.context.clear();
    }

    fn render_phase_prompt(&self, index: usize, kind: PhaseKind) -> String {
        let phase = &self.phases[index];
        let previous = self.context.entries_excluding(&phase.name);
        phase_prompt(
            kind,
            &PhasePrompt {
                name: &phase.name,
                requirements: &phase.requirements,
                previous_results: &previous,
                original_query: &self.original_query,
            },
        )
    }

    /// One best-effort improvement call for the final phase.
    ///
    /// Replaces the result only when the new score is strictly higher. Never
    /// changes status or attempt count; failures are logged and dropped.
    async fn improve(&mut self, index: usize) {
        let phase = &self.phases[index];
        let Some(current) = phase.result.as_ref() else {
            return;
        };
        if !wants_improvement(current, phase.attempt_count, &self.settings) {
            return;
        }

        info!(
            phase = %phase.name,
            score = current.quality_score,
            "Final phase below improvement threshold; requesting improvement"
        );
        let original_score = current.quality_score;
        let prompt = improvement_prompt(
            PhaseKind::Execution,
            &current.content,
            current.quality_score,
            &current.issues,
            &current.suggestions,
            &phase.requirements,
        );
        let label = format!("{} (improvement)", phase.name);

        let attempt = self.call_for_result(&label, prompt).await;
        match attempt {
            Ok(improved) if improved.quality_score > original_score => {
                info!(
                    phase = %label,
                    from = original_score,
                    to = improved.quality_score,
                    "Improvement accepted"
                );
                self.phases[index].result = Some(improved);
            }
            Ok(improved) => {
                info!(
                    phase = %label,
                    score = improved.quality_score,
                    kept = original_score,
                    "Improvement did not raise the score; keeping original"
                );
            }
            Err(err) => {
                warn!(phase = %label, error = %err, "Improvement attempt failed; keeping original");
            }
        }
    }

    async fn call_for_result(&self, label: &str, prompt: String) -> Result<PhaseResult, ChainError> {
        let response = self.call(label, prompt).await?;
        let payload = extract_payload(&response, &Delimiters::PHASE_OUTPUT)?;
        Ok(parse_phase_output(&payload)?)
    }

    async fn call(&self, label: &str, prompt: String) -> Result<String, ChainError> {
        let invocation = LlmInvocation::prompt(
            label,
            self.settings.model_name(),
            self.settings.timeout,
            prompt,
        );
        let result = self.backend.invoke(invocation).await?;
        debug!(
            label,
            model = %result.model_used,
            tokens = result.total_tokens(),
            "Model call returned"
        );
        Ok(result.raw_response)
    }
}
