//! Recovery of structured payloads from free-form model responses.
//!
//! Models are asked to wrap a JSON object between a pair of tags such as
//! `<phase_output>` / `</phase_output>`. What comes back is frequently not
//! valid JSON: raw newlines inside string values, stray quotes, trailing
//! commas, unquoted words. [`extract_payload`] locates the block and runs a
//! deterministic repair pipeline before parsing:
//!
//! 1. locate the first opening marker and the first closing marker after it
//! 2. trim and normalize line endings and control characters
//! 3. escape string contents so the text becomes machine-parseable
//! 4. strict parse, then a relaxed parse as fallback
//!
//! Display text taken out of the payload goes through [`restore_newlines`].

mod normalize;
mod relaxed;
mod repair;

use serde_json::{Map, Value};
use thinkchain_utils::ExtractionError;
use tracing::debug;

pub use normalize::normalize;
pub use repair::repair_strings;

/// An opening/closing marker pair delimiting a payload in model text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub open: &'static str,
    pub close: &'static str,
}

impl Delimiters {
    /// Framework proposal block
    pub const FRAMEWORK: Delimiters = Delimiters::new("<framework>", "</framework>");

    /// Phase result block
    pub const PHASE_OUTPUT: Delimiters = Delimiters::new("<phase_output>", "</phase_output>");

    #[must_use]
    pub const fn new(open: &'static str, close: &'static str) -> Self {
        Self { open, close }
    }
}

/// Return the trimmed text between the first `open` marker and the first
/// `close` marker that follows it.
pub fn locate_block<'a>(text: &'a str, delimiters: &Delimiters) -> Result<&'a str, ExtractionError> {
    let start = text
        .find(delimiters.open)
        .ok_or_else(|| ExtractionError::MissingOpenMarker {
            marker: delimiters.open.to_string(),
        })?
        + delimiters.open.len();

    let end = text[start..]
        .find(delimiters.close)
        .ok_or_else(|| ExtractionError::MissingCloseMarker {
            marker: delimiters.close.to_string(),
        })?;

    Ok(text[start..start + end].trim())
}

/// Extract and repair the JSON object delimited by `delimiters` in `text`.
///
/// Fails with [`ExtractionError`] when a marker is missing, when neither the
/// strict nor the relaxed parser accepts the repaired payload (the strict
/// parser's position and the repaired text are reported), or when the payload
/// is valid JSON but not an object.
pub fn extract_payload(
    text: &str,
    delimiters: &Delimiters,
) -> Result<Map<String, Value>, ExtractionError> {
    let block = locate_block(text, delimiters)?;
    let normalized = normalize(block);
    let repaired = repair_strings(&normalized);

    let value = match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => value,
        Err(strict_err) => {
            debug!(error = %strict_err, "Strict parse failed; trying relaxed parse");
            let relaxed = relaxed::relax(&repaired);
            serde_json::from_str::<Value>(&relaxed).map_err(|_| ExtractionError::Unparseable {
                reason: strict_err.to_string(),
                line: strict_err.line(),
                column: strict_err.column(),
                payload: repaired.clone(),
            })?
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ExtractionError::NotAnObject {
            found: json_type_name(&other).to_string(),
        }),
    }
}

/// Replace every literal two-character `\n` sequence with a real newline.
///
/// Models sometimes double-escape line breaks; after parsing those survive as
/// backslash + `n` in the value and must be undone for display.
#[must_use]
pub fn restore_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
