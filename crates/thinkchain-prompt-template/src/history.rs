use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Fenced code block with an optional language tag
static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[\w+-]*\n(.*?)```").expect("valid regex"));

/// One earlier exchange in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

/// Replace fenced code blocks with neutral `<CODE>` … `</CODE>` markers so
/// history does not collide with the JSON formatting requested in prompts.
#[must_use]
pub fn wrap_code_blocks(text: &str) -> String {
    FENCED_BLOCK
        .replace_all(text, |caps: &regex::Captures<'_>| {
            format!("<CODE>\n{}\n</CODE>", caps[1].trim())
        })
        .into_owned()
}

/// Prefix `query` with earlier conversation turns.
///
/// Turns with empty content are skipped; with no usable history the query is
/// returned unchanged.
#[must_use]
pub fn compose_query_with_history(history: &[HistoryTurn], query: &str) -> String {
    let turns: Vec<String> = history
        .iter()
        .filter(|turn| !turn.content.trim().is_empty())
        .map(|turn| format!("{}:\n{}\n\n", turn.role, wrap_code_blocks(turn.content.trim())))
        .collect();

    if turns.is_empty() {
        return query.to_string();
    }

    format!(
        "Previous conversation:\n{}\nNote: Code blocks in the above history are wrapped in <CODE> tags.\n\nNew query: {query}",
        turns.concat()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_fenced_blocks() {
        let text = "Here:\n```rust\nfn main() {}\n```\nand\n```\nplain\n```";
        assert_eq!(
            wrap_code_blocks(text),
            "Here:\n<CODE>\nfn main() {}\n</CODE>\nand\n<CODE>\nplain\n</CODE>"
        );
    }

    #[test]
    fn test_text_without_fences_unchanged() {
        assert_eq!(wrap_code_blocks("no code here"), "no code here");
    }

    #[test]
    fn test_compose_with_history() {
        let history = vec![
            HistoryTurn {
                role: "User".to_string(),
                content: "Show me hello world\n".to_string(),
            },
            HistoryTurn {
                role: "Assistant".to_string(),
                content: "```python\nprint('hi')\n```".to_string(),
            },
            HistoryTurn {
                role: "User".to_string(),
                content: "   ".to_string(),
            },
        ];
        let composed = compose_query_with_history(&history, "Now in Rust");
        assert!(composed.starts_with("Previous conversation:\nUser:\nShow me hello world\n\n"));
        assert!(composed.contains("Assistant:\n<CODE>\nprint('hi')\n</CODE>\n\n"));
        assert!(composed.ends_with("New query: Now in Rust"));
        assert_eq!(composed.matches("User:").count(), 1);
    }

    #[test]
    fn test_compose_without_history_is_identity() {
        assert_eq!(compose_query_with_history(&[], "q"), "q");
    }
}
