//! Scrubbing of credentials from messages before they reach logs or reports.

use once_cell::sync::Lazy;
use regex::Regex;

/// URLs with embedded `user:password@` credentials
static URL_WITH_CREDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(https?://)[^:@\s]+:[^@\s]+@").expect("valid regex"));

/// Bearer tokens in echoed headers
static BEARER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(bearer\s+)[A-Za-z0-9._~+/=-]+").expect("valid regex"));

/// Long runs of key-like characters (32+), bounded by non-key characters
static POTENTIAL_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|[^A-Za-z0-9_-])([A-Za-z0-9_-]{32,})").expect("valid regex")
});

/// Redact sensitive information from an error message.
///
/// Keeps enough of the message to debug with while removing embedded URL
/// credentials, bearer tokens and anything shaped like an API key.
#[must_use]
pub fn redact_error_message(message: &str) -> String {
    let redacted = URL_WITH_CREDS.replace_all(message, "$1[REDACTED]@");
    let redacted = BEARER_TOKEN.replace_all(&redacted, "${1}[REDACTED]");
    let redacted = POTENTIAL_KEY.replace_all(&redacted, "${1}[REDACTED_KEY]");
    redacted.into_owned()
}
