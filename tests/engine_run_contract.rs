//! End-to-end run contract through the public facade.
//!
//! The engine is wired exactly as `engine_from_config` wires it, except the
//! provider is a scripted backend, so budget and usage layers are exercised.

use serde_json::json;
use std::sync::Arc;
use thinkchain::{Config, Engine, EngineSettings, ModelClient, PhaseStatus};
use thinkchain_llm::ScriptedBackend;

fn framework_text(names: &[&str]) -> String {
    let phases: Vec<_> = names
        .iter()
        .map(|name| json!({"name": name, "type": "analysis", "requirements": {"focus": name, "depth": 2}}))
        .collect();
    let body = json!({
        "query_type": "code_generation",
        "final_output_type": "code",
        "phases": phases,
        "success_criteria": {"overall_objective": "working code", "quality_metrics": ["compiles"]}
    });
    format!("<framework>{body}</framework>")
}

/// Phase output the way models tend to emit it: raw newlines inside strings
fn phase_text(content: &str, score: u32, action: &str) -> String {
    format!(
        "Sure.\n<phase_output>\n{{\n  \"analysis\": \"{content}\",\n  \"output\": \"{content}\",\n  \"conclusions\": [\"ok\"],\n  \"quality_check\": {{\"score\": {score}, \"issues\": [], \"suggestions\": []}},\n  \"next_action\": \"{action}\"\n}}\n</phase_output>\nDone."
    )
}

fn wired(config: &Config, backend: &Arc<ScriptedBackend>) -> (Engine, ModelClient) {
    let client = thinkchain_llm::wrap(Box::new(backend.clone()), config);
    let engine = Engine::new(client.backend.clone(), EngineSettings::from_config(config));
    (engine, client)
}

#[tokio::test]
async fn test_full_run_with_usage_accounting() {
    let config = Config::builder().model("test/model").build().unwrap();
    let backend = Arc::new(ScriptedBackend::new([
        framework_text(&["Design", "Implement"]),
        phase_text("outline the API", 90, "proceed"),
        phase_text("fn main() {\n    println!(\"hi\");\n}", 98, "proceed"),
    ]));
    let (mut engine, client) = wired(&config, &backend);

    let report = engine.run("write hello world").await.unwrap();

    assert!(report.succeeded());
    assert_eq!(report.framework.phases.len(), 2);
    assert_eq!(
        report.framework.phases[0].requirements["depth"],
        json!("2")
    );
    let output = report.final_output().unwrap();
    assert!(output.starts_with("fn main() {\n"));

    let usage = client.usage.report();
    assert_eq!(usage.requests_made, 3);
    assert_eq!(usage.usage.prompt_tokens, 30);
    assert!(usage.estimated_cost > 0.0);
    assert_eq!(usage.latest_request.unwrap().label, "Implement");
}

#[tokio::test]
async fn test_budget_exhaustion_fails_the_phase_not_the_run() {
    let config = Config::builder().budget(2).build().unwrap();
    let backend = Arc::new(ScriptedBackend::new([
        framework_text(&["First", "Second"]),
        phase_text("first", 90, "proceed"),
        phase_text("never sent", 99, "proceed"),
    ]));
    let (mut engine, client) = wired(&config, &backend);

    let report = engine.run("q").await.unwrap();

    assert!(!report.succeeded());
    assert_eq!(report.outcomes.len(), 2);
    let failed = report.failed_phase().unwrap();
    assert_eq!(failed.name, "Second");
    assert!(failed.failure.as_deref().unwrap().contains("Budget exceeded"));
    assert_eq!(backend.remaining(), 1);
    assert_eq!(client.usage.request_count(), 2);
    assert!(report.final_output().is_none());
}

#[tokio::test]
async fn test_configured_attempt_ceiling_applies() {
    let config = Config::builder().max_attempts(1).build().unwrap();
    let backend = Arc::new(ScriptedBackend::new([
        framework_text(&["Only"]),
        phase_text("weak", 40, "recurse"),
        phase_text("unused", 99, "proceed"),
    ]));
    let (mut engine, _client) = wired(&config, &backend);

    let report = engine.run("q").await.unwrap();

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, PhaseStatus::Failed);
    assert_eq!(outcome.attempt_count, 1);
    // One improvement attempt still runs on the final phase
    assert_eq!(backend.labels(), ["framework", "Only", "Only (improvement)"]);
}

#[tokio::test]
async fn test_report_serializes_for_hosts() {
    let config = Config::builder().build().unwrap();
    let backend = Arc::new(ScriptedBackend::new([
        framework_text(&["Only"]),
        phase_text("answer", 97, "proceed"),
    ]));
    let (mut engine, _client) = wired(&config, &backend);

    let report = engine.run("q").await.unwrap();
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["framework"]["query_type"], "code_generation");
    assert_eq!(value["framework"]["phases"][0]["type"], "analysis");
    assert_eq!(value["outcomes"][0]["status"], "complete");
    assert_eq!(value["outcomes"][0]["result"]["quality_score"], 97.0);
    assert!(value["outcomes"][0].get("failure").is_none());
}
