use std::fmt::Write as _;

/// Where a string sits in the surrounding structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringRole {
    /// Object key, after `{` or `,`
    Key,
    /// Object member value, after `:`
    Member,
    /// Array element
    Element,
    /// Not inside any object or array
    Bare,
}

/// Escape the contents of every JSON string so the text becomes parseable.
///
/// Outside strings the text passes through untouched, so nested objects and
/// arrays keep their structure. Inside a string:
///
/// - raw newline, carriage return, tab, backspace and form feed become their
///   two-character escapes; other C0 controls become `\u00XX`
/// - valid escape sequences are kept; a backslash starting anything else is
///   itself escaped
/// - a double quote only terminates the string when what follows fits the
///   enclosing container: a key ends before `:`, a member value before `}`
///   or a comma leading into the next key, an array element before `]` or a
///   comma leading into the next value; any other quote is escaped as part
///   of the content
///
/// Text that is already valid JSON comes out unchanged.
#[must_use]
pub fn repair_strings(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut containers: Vec<char> = Vec::new();
    let mut last_token: Option<char> = None;
    let mut role: Option<StringRole> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        let Some(current) = role else {
            match c {
                '"' => role = Some(role_for(containers.last().copied(), last_token)),
                '{' | '[' => containers.push(c),
                '}' | ']' => {
                    containers.pop();
                }
                _ => {}
            }
            if !c.is_whitespace() {
                last_token = Some(c);
            }
            out.push(c);
            i += 1;
            continue;
        };

        match c {
            '\\' => match chars.get(i + 1) {
                Some(&next) if matches!(next, '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => {
                    out.push('\\');
                    out.push(next);
                    i += 2;
                    continue;
                }
                Some('u') if is_unicode_escape(&chars, i + 2) => {
                    out.extend(&chars[i..i + 6]);
                    i += 6;
                    continue;
                }
                _ => out.push_str("\\\\"),
            },
            '"' => {
                if closes_string(&chars, i + 1, current) {
                    role = None;
                    last_token = Some('"');
                    out.push('"');
                } else {
                    out.push_str("\\\"");
                }
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if c < ' ' => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
        i += 1;
    }

    out
}

fn role_for(container: Option<char>, last_token: Option<char>) -> StringRole {
    match container {
        Some('{') if matches!(last_token, Some('{' | ',')) => StringRole::Key,
        Some('{') => StringRole::Member,
        Some('[') => StringRole::Element,
        _ => StringRole::Bare,
    }
}

fn is_unicode_escape(chars: &[char], start: usize) -> bool {
    chars
        .get(start..start + 4)
        .is_some_and(|digits| digits.iter().all(char::is_ascii_hexdigit))
}

fn skip_whitespace(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && matches!(chars[i], ' ' | '\t' | '\n' | '\r') {
        i += 1;
    }
    i
}

/// Whether a quote whose successor is at `i` ends a string playing `role`
fn closes_string(chars: &[char], i: usize, role: StringRole) -> bool {
    let i = skip_whitespace(chars, i);
    let next = chars.get(i).copied();
    match role {
        StringRole::Key => matches!(next, None | Some(':' | '}')),
        StringRole::Member => match next {
            None | Some('}') => true,
            Some(',') => starts_key(chars, i + 1),
            Some(_) => false,
        },
        StringRole::Element => match next {
            None | Some(']') => true,
            Some(',') => starts_value(chars, i + 1),
            Some(_) => false,
        },
        StringRole::Bare => match next {
            None | Some(':' | '}' | ']') => true,
            Some(',') => starts_value(chars, i + 1),
            Some(_) => false,
        },
    }
}

/// End of the bareword starting at `i`
fn bareword_end(chars: &[char], i: usize) -> usize {
    chars[i..]
        .iter()
        .position(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(chars.len(), |p| i + p)
}

/// Whether the text at `i` (just after a comma inside an object) begins the
/// next key, or closes the object after a trailing comma
fn starts_key(chars: &[char], i: usize) -> bool {
    let i = skip_whitespace(chars, i);
    match chars.get(i) {
        None | Some('}') => true,
        Some('"') => {
            let mut j = i + 1;
            while let Some(&c) = chars.get(j) {
                match c {
                    '"' => return chars.get(skip_whitespace(chars, j + 1)) == Some(&':'),
                    '\n' => return false,
                    '\\' => j += 2,
                    _ => j += 1,
                }
            }
            false
        }
        Some(c) if c.is_ascii_alphabetic() || *c == '_' => {
            chars.get(skip_whitespace(chars, bareword_end(chars, i))) == Some(&':')
        }
        Some(_) => false,
    }
}

/// Whether the text at `i` (just after a comma) begins another value or key
fn starts_value(chars: &[char], i: usize) -> bool {
    let i = skip_whitespace(chars, i);
    match chars.get(i) {
        None | Some('"' | '{' | '[' | '}' | ']' | '-') => true,
        Some(c) if c.is_ascii_digit() => true,
        Some(c) if c.is_ascii_alphabetic() || *c == '_' => {
            let end = bareword_end(chars, i);
            let word: String = chars[i..end].iter().collect();
            if matches!(word.as_str(), "true" | "false" | "null") {
                return true;
            }
            // Unquoted key, as in `, name: ...`
            chars.get(skip_whitespace(chars, end)) == Some(&':')
        }
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_json_is_unchanged() {
        let text = r#"{"a": "x\"y\\z\u00e9", "b": [1, -2.5e3, true, null], "c": {"d": ""}}"#;
        assert_eq!(repair_strings(text), text);
    }

    #[test]
    fn test_escapes_raw_whitespace_controls() {
        let text = "{\"a\": \"x\ny\tz\u{8}\u{c}\r\"}";
        assert_eq!(repair_strings(text), r#"{"a": "x\ny\tz\b\f\r"}"#);
    }

    #[test]
    fn test_escapes_lone_backslash() {
        assert_eq!(
            repair_strings(r#"{"path": "C:\Users\me"}"#),
            r#"{"path": "C:\\Users\\me"}"#
        );
    }

    #[test]
    fn test_inner_quotes_are_escaped() {
        assert_eq!(
            repair_strings(r#"{"a": "say "hi" now", "b": 1}"#),
            r#"{"a": "say \"hi\" now", "b": 1}"#
        );
    }

    #[test]
    fn test_quote_before_comma_and_prose_is_content() {
        assert_eq!(
            repair_strings(r#"{"a": "he said "yes", then left"}"#),
            r#"{"a": "he said \"yes\", then left"}"#
        );
    }

    #[test]
    fn test_quote_before_unquoted_key_closes() {
        assert_eq!(
            repair_strings(r#"{"a": "x", b: 1}"#),
            r#"{"a": "x", b: 1}"#
        );
    }

    #[test]
    fn test_nested_structures_pass_through() {
        let text = "{\"q\": {\"issues\": [\"one\ntwo\", \"three\"]}}";
        assert_eq!(
            repair_strings(text),
            r#"{"q": {"issues": ["one\ntwo", "three"]}}"#
        );
    }

    #[test]
    fn test_call_arguments_inside_member_value() {
        assert_eq!(
            repair_strings(r#"{"output": "tuple ("a", 1)"}"#),
            r#"{"output": "tuple (\"a\", 1)"}"#
        );
    }

    #[test]
    fn test_list_literal_inside_member_value() {
        assert_eq!(
            repair_strings(r#"{"output": "list ["a", "b"]"}"#),
            r#"{"output": "list [\"a\", \"b\"]"}"#
        );
    }

    #[test]
    fn test_dict_literal_inside_member_value() {
        assert_eq!(
            repair_strings(r#"{"output": "d = {"a": 1}", "next_action": "proceed"}"#),
            r#"{"output": "d = {\"a\": 1}", "next_action": "proceed"}"#
        );
    }

    #[test]
    fn test_array_elements_still_split_on_comma() {
        assert_eq!(
            repair_strings(r#"{"issues": ["a "b"", "c"]}"#),
            r#"{"issues": ["a \"b\"", "c"]}"#
        );
    }
}
