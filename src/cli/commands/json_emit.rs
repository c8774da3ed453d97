//! JSON output for `--json` modes

use anyhow::Result;
use serde_json::{Map, Value, json};
use thinkchain_llm::UsageReport;

use crate::{Config, RunReport};

pub fn emit_run_json(report: &RunReport, usage: &UsageReport) -> Result<String> {
    let value = json!({
        "query": report.query,
        "succeeded": report.succeeded(),
        "framework": report.framework,
        "outcomes": report.outcomes,
        "final_output": report.final_output(),
        "usage": usage,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

pub fn emit_config_json(config: &Config) -> Result<String> {
    let map: Map<String, Value> = config
        .effective_config()
        .into_iter()
        .map(|(key, (value, source))| (key, json!({"value": value, "source": source})))
        .collect();
    Ok(serde_json::to_string_pretty(&Value::Object(map))?)
}
