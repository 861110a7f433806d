//! JSON array extraction and repair for generated test case batches.
//!
//! Chain: slice the outermost `[...]` → strict parse → repair → strict parse.
//! Only a non-empty array is accepted.

use serde_json::Value;
use tracing::{debug, warn};

use super::{type_name, Decoded, Rejection};
use crate::types::TestCase;

/// Slice from the first `[` to the last `]` (inclusive).
///
/// Tolerates prose before and after the array. Text without a well-ordered
/// bracket pair is returned unchanged.
pub fn slice_array(reply: &str) -> &str {
    match (reply.find('['), reply.rfind(']')) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => reply,
    }
}

/// Strict parse; accepts only a non-empty JSON array.
pub fn parse_array(text: &str) -> Decoded<Vec<Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) if !items.is_empty() => Decoded::Parsed(items),
        Ok(Value::Array(_)) => Decoded::Rejected(Rejection::Unexpected("empty array".into())),
        Ok(other) => Decoded::Rejected(Rejection::Unexpected(type_name(&other).into())),
        Err(e) => Decoded::Rejected(Rejection::Malformed(e.to_string())),
    }
}

/// Best-effort repair of common LLM JSON mistakes.
///
/// - single-quoted strings become double-quoted
/// - bare object keys are quoted
/// - trailing commas before `]` or `}` are removed
pub fn repair_json(text: &str) -> String {
    fix_structure(&normalize_quotes(text))
}

/// Decode a test case batch from a raw oracle reply.
///
/// The repair pass only runs when strict parsing fails on syntax; a
/// well-formed but empty or non-array reply is rejected directly.
/// Objects always decode (see [`TestCase`]), bare strings become a case's
/// input and other scalars are skipped.
pub fn decode_test_cases(reply: &str) -> Decoded<Vec<TestCase>> {
    let candidate = slice_array(reply);

    let values = match parse_array(candidate) {
        Decoded::Rejected(Rejection::Malformed(err)) => {
            debug!("Strict parse failed ({}), attempting repair", err);
            match parse_array(&repair_json(candidate)) {
                Decoded::Parsed(items) => Decoded::Repaired(items),
                other => other,
            }
        }
        other => other,
    };

    match values {
        Decoded::Parsed(items) => into_test_cases(items).map_or_else(
            || Decoded::Rejected(Rejection::Unexpected("no usable test cases".into())),
            Decoded::Parsed,
        ),
        Decoded::Repaired(items) => into_test_cases(items).map_or_else(
            || Decoded::Rejected(Rejection::Unexpected("no usable test cases".into())),
            Decoded::Repaired,
        ),
        Decoded::Rejected(reason) => Decoded::Rejected(reason),
    }
}

fn into_test_cases(items: Vec<Value>) -> Option<Vec<TestCase>> {
    let total = items.len();
    let cases: Vec<TestCase> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match item {
            Value::String(input) => Some(TestCase::from_input(input)),
            item @ Value::Object(_) => match serde_json::from_value::<TestCase>(item) {
                Ok(case) => Some(case),
                Err(e) => {
                    warn!("Skipping test case {} of {}: {}", i + 1, total, e);
                    None
                }
            },
            other => {
                warn!("Skipping test case {} of {}: {}", i + 1, total, type_name(&other));
                None
            }
        })
        .collect();

    (!cases.is_empty()).then_some(cases)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Double,
    Single,
}

/// Rewrite single-quoted strings as double-quoted ones.
///
/// Apostrophes inside double-quoted strings are left alone; double quotes
/// inside single-quoted strings are escaped.
fn normalize_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut state = Quote::None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match state {
            Quote::None => match c {
                '"' => {
                    state = Quote::Double;
                    out.push('"');
                }
                '\'' => {
                    state = Quote::Single;
                    out.push('"');
                }
                _ => out.push(c),
            },
            Quote::Double => {
                out.push(c);
                match c {
                    '\\' => {
                        if let Some(next) = chars.next() {
                            out.push(next);
                        }
                    }
                    '"' => state = Quote::None,
                    _ => {}
                }
            }
            Quote::Single => match c {
                '\\' => match chars.next() {
                    Some('\'') => out.push('\''),
                    Some(next) => {
                        out.push('\\');
                        out.push(next);
                    }
                    None => out.push('\\'),
                },
                '\'' => {
                    state = Quote::None;
                    out.push('"');
                }
                '"' => out.push_str("\\\""),
                _ => out.push(c),
            },
        }
    }

    out
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Quote bare keys and drop trailing commas, outside string literals.
fn fix_structure(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    // Set after `{` or `,`, where an object key may start
    let mut key_position = false;
    let mut i = 0;

    while i < len {
        let c = chars[i];

        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < len {
                out.push(chars[i + 1]);
                i += 1;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                key_position = false;
                out.push(c);
            }
            '{' => {
                key_position = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if matches!(next, Some(']') | Some('}')) {
                    i += 1;
                    continue;
                }
                key_position = true;
                out.push(c);
            }
            c if key_position && is_ident(c) => {
                let start = i;
                let mut end = i;
                while end < len && is_ident(chars[end]) {
                    end += 1;
                }
                let followed_by_colon = chars[end..]
                    .iter()
                    .find(|ch| !ch.is_whitespace())
                    .is_some_and(|ch| *ch == ':');

                if followed_by_colon {
                    out.push('"');
                    out.extend(&chars[start..end]);
                    out.push('"');
                } else {
                    out.extend(&chars[start..end]);
                }
                key_position = false;
                i = end;
                continue;
            }
            c if c.is_whitespace() => out.push(c),
            _ => {
                key_position = false;
                out.push(c);
            }
        }

        i += 1;
    }

    out
}
