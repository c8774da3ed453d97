/// Normalize a raw payload before repair.
///
/// CRLF becomes LF, trailing whitespace is dropped from every line, and C0
/// control characters other than tab are removed. Blank lines are kept.
#[must_use]
pub fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n");
    unified
        .split('\n')
        .map(|line| {
            line.trim_end()
                .chars()
                .filter(|&c| c >= ' ' || c == '\t')
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crlf_and_trailing_whitespace() {
        assert_eq!(normalize("{ \r\n  \"a\": 1   \r\n}\t"), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_drops_control_characters_but_keeps_tabs_and_blank_lines() {
        assert_eq!(normalize("a\u{0}b\u{1b}c\td\n\ne"), "abc\td\n\ne");
    }

    #[test]
    fn test_lone_carriage_return_is_dropped() {
        assert_eq!(normalize("a\rb"), "ab");
    }

    #[test]
    fn test_keeps_non_ascii() {
        assert_eq!(normalize("思考 ✓ \u{7f}"), "思考 ✓ \u{7f}");
    }
}
