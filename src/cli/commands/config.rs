//! `thinkchain config` implementation

use anyhow::Result;

use super::json_emit::emit_config_json;
use crate::{Config, ExitCode};

pub fn execute_config_command(config: &Config, json: bool) -> Result<ExitCode> {
    if json {
        println!("{}", emit_config_json(config)?);
        return Ok(ExitCode::SUCCESS);
    }

    let effective = config.effective_config();
    let width = effective.keys().map(String::len).max().unwrap_or(0);

    println!("Effective configuration:");
    for (key, (value, source)) in &effective {
        println!("  {key:<width$} = {value}  ({source})");
    }
    Ok(ExitCode::SUCCESS)
}
