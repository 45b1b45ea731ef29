//! Turning raw model text into a `serde_json::Value`.
//!
//! Models wrap JSON in code fences, prepend chatter, or return a JSON
//! document encoded as a string. None of that is an error: anything that
//! cannot be recovered becomes `Value::Null` and the normalizer fills in
//! defaults.

use serde_json::Value;

/// Strip markdown code blocks from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Best-effort parse of a model response.
pub fn parse_jsonish(raw: &str) -> Value {
    let text = strip_code_blocks(raw);
    if text.is_empty() {
        return Value::Null;
    }

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return unwrap_stringified(value);
    }

    // Chatter around the payload: take the outermost object or array.
    if let Some(span) = outermost_span(text) {
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            return unwrap_stringified(value);
        }
    }

    Value::Null
}

/// A JSON string whose content is itself a JSON document is unwrapped once.
fn unwrap_stringified(value: Value) -> Value {
    if let Value::String(ref s) = value {
        let inner = strip_code_blocks(s);
        if inner.starts_with('{') || inner.starts_with('[') {
            if let Ok(parsed) = serde_json::from_str::<Value>(inner) {
                return parsed;
            }
        }
    }
    value
}

fn outermost_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}
