use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// JSON number grammar
static JSON_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?(?:0|[1-9][0-9]*)(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?$").expect("valid regex")
});

/// Rewrite JSON-like text into strict JSON.
///
/// Tolerates trailing commas, `//` and `/* */` comments, single-quoted
/// strings, unquoted keys and unquoted scalar values. A bare value runs to the
/// next `,`, `}`, `]` or line break and is kept raw only when it is a number
/// or `true`/`false`/`null`.
pub(crate) fn relax(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut stack: Vec<char> = Vec::new();
    // Last structural character emitted, or 'v' after a value
    let mut last = ' ';
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                let end = double_quoted_end(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
                last = 'v';
                continue;
            }
            '\'' => {
                let (literal, end) = single_quoted(&chars, i);
                out.push_str(&literal);
                i = end;
                last = 'v';
                continue;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i = (i + 2).min(chars.len());
                continue;
            }
            '{' | '[' => {
                stack.push(c);
                out.push(c);
                last = c;
            }
            '}' | ']' => {
                stack.pop();
                out.push(c);
                last = 'v';
            }
            ',' => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if !matches!(chars.get(j), None | Some('}' | ']')) {
                    out.push(',');
                    last = ',';
                }
            }
            ':' => {
                out.push(':');
                last = ':';
            }
            c if c.is_whitespace() => out.push(c),
            _ => {
                let key_position = stack.last() == Some(&'{') && matches!(last, '{' | ',');
                let start = i;
                while i < chars.len() {
                    let stop = if key_position {
                        matches!(chars[i], ':' | ',' | '}' | '\n')
                    } else {
                        matches!(chars[i], ',' | '}' | ']' | '\n')
                    };
                    if stop {
                        break;
                    }
                    i += 1;
                }
                let token: String = chars[start..i].iter().collect();
                let token = token.trim_end();
                if !key_position
                    && (matches!(token, "true" | "false" | "null") || JSON_NUMBER.is_match(token))
                {
                    out.push_str(token);
                } else {
                    out.push_str(&Value::String(token.to_string()).to_string());
                }
                last = 'v';
                continue;
            }
        }
        i += 1;
    }

    out
}

/// Index just past the closing quote of the double-quoted string at `start`
fn double_quoted_end(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '"' => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// Convert the single-quoted string at `start` into a JSON string literal
fn single_quoted(chars: &[char], start: usize) -> (String, usize) {
    let mut content = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if chars.get(i + 1) == Some(&'\'') => {
                content.push('\'');
                i += 2;
            }
            '\\' if i + 1 < chars.len() => {
                content.push('\\');
                content.push(chars[i + 1]);
                i += 2;
            }
            '\'' => {
                i += 1;
                break;
            }
            c => {
                content.push(c);
                i += 1;
            }
        }
    }

    // Re-encode: keep existing escapes, escape bare double quotes
    let mut literal = String::with_capacity(content.len() + 2);
    literal.push('"');
    let body: Vec<char> = content.chars().collect();
    let mut j = 0;
    while j < body.len() {
        match body[j] {
            '\\' if j + 1 < body.len() => {
                literal.push('\\');
                literal.push(body[j + 1]);
                j += 2;
                continue;
            }
            '\\' => literal.push_str("\\\\"),
            '"' => literal.push_str("\\\""),
            '\n' => literal.push_str("\\n"),
            c => literal.push(c),
        }
        j += 1;
    }
    literal.push('"');
    (literal, i)
}
