//! Prompt templates for thinkchain model calls.
//!
//! All builders are pure functions of their inputs. The delimiter tags and
//! JSON field names they request are the wire contract that the extraction
//! and schema layers rely on.

mod framework;
mod history;
mod improvement;
mod phase;

pub use framework::framework_prompt;
pub use history::{HistoryTurn, compose_query_with_history, wrap_code_blocks};
pub use improvement::improvement_prompt;
pub use phase::{PhaseKind, PhasePrompt, phase_prompt};

use serde_json::{Map, Value};

/// Appended to every phase and improvement prompt
pub const FORMAT_FOOTER: &str = "
Note on output format:
1. For multiline text, use \\n to indicate line breaks
2. Avoid using raw newlines in JSON values
3. Properly escape all special characters
4. Keep JSON structure clean and valid
";

/// Pretty-print a JSON object with two-space indentation, keeping key order
fn pretty(map: &Map<String, Value>) -> String {
    format!("{:#}", Value::Object(map.clone()))
}
