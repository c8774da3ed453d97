//! Per-run context shared across phases

use serde_json::{Map, Value};

/// Key under which the framework payload is stored
pub const FRAMEWORK_KEY: &str = "framework";

/// Append-only, insertion-ordered map from phase name to result content.
///
/// An entry, once written, is never replaced; later phases only read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunContext {
    entries: Vec<(String, String)>,
}

impl RunContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the framework payload under [`FRAMEWORK_KEY`]
    pub(crate) fn record_framework(&mut self, payload: &Map<String, Value>) {
        self.append(FRAMEWORK_KEY, Value::Object(payload.clone()).to_string());
    }

    /// Append an entry. Returns `false`, leaving the context unchanged, if
    /// the key is already present.
    pub fn append(&mut self, key: impl Into<String>, content: impl Into<String>) -> bool {
        let key = key.into();
        if self.contains(&key) {
            return false;
        }
        self.entries.push((key, content.into()));
        true
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All entries except `key`, in insertion order
    #[must_use]
    pub fn entries_excluding(&self, key: &str) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter(|(k, _)| k != key)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_refuses_duplicates() {
        let mut ctx = RunContext::new();
        assert!(ctx.append("a", "first"));
        assert!(!ctx.append("a", "second"));
        assert_eq!(ctx.get("a"), Some("first"));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_entries_excluding_keeps_order() {
        let mut ctx = RunContext::new();
        ctx.append("b", "2");
        ctx.append("a", "1");
        ctx.append("c", "3");

        let keys: Vec<_> = ctx
            .entries_excluding("a")
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, ["b", "c"]);
    }

    #[test]
    fn test_framework_entry_is_compact_json() {
        let mut ctx = RunContext::new();
        let mut payload = Map::new();
        payload.insert("query_type".into(), Value::String("analysis".into()));
        ctx.record_framework(&payload);
        assert_eq!(ctx.get(FRAMEWORK_KEY), Some(r#"{"query_type":"analysis"}"#));
    }
}
