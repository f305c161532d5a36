//! # Tolerant output parsing.
//!
//! Command-line AI tools rarely emit clean JSON: the payload arrives wrapped
//! in prose preambles, markdown code fences, or a `{"response": "..."}`
//! envelope. [`parse`] extracts a typed [`serde_json::Value`] from such text
//! with a two-tier strategy:
//!
//! 1. **Envelope unwrap** — if the whole text is a JSON object carrying a
//!    string `response` field, that field's value becomes the text to parse.
//! 2. **Direct parse** — the (possibly substituted) text as JSON. For
//!    [`ExpectedShape::JsonArray`] a non-array result falls through to tier 3.
//! 3. **Bracket slice** — the substring from the first opening bracket to the
//!    last matching closing bracket (pair chosen by the expected shape),
//!    parsed as JSON.
//!
//! ## Rules
//! - Pure and side-effect free: no I/O, never panics.
//! - Any failure returns `None`, which the engine maps to the retryable
//!   "no valid response" classification.

use serde_json::Value;

/// Expected shape of the tool's output, guiding shape validation and
/// fallback bracket selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExpectedShape {
    /// The payload must be a JSON array.
    JsonArray,
    /// The payload is a JSON object.
    #[default]
    JsonObject,
    /// No shape constraint; the first complete bracket pair wins.
    Unstructured,
}

impl ExpectedShape {
    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ExpectedShape::JsonArray => "json-array",
            ExpectedShape::JsonObject => "json-object",
            ExpectedShape::Unstructured => "unstructured",
        }
    }
}

/// Parses raw tool output into a JSON value, or `None` if no usable payload
/// can be extracted.
///
/// # Example
/// ```
/// use promptvisor::{parse, ExpectedShape};
/// use serde_json::json;
///
/// let v = parse("noise [1,2,3] noise", ExpectedShape::JsonArray);
/// assert_eq!(v, Some(json!([1, 2, 3])));
/// ```
pub fn parse(raw: &str, shape: ExpectedShape) -> Option<Value> {
    let text = unwrap_envelope(raw);
    let text = text.as_deref().unwrap_or(raw);

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if shape_ok(&value, shape) {
            return Some(value);
        }
    }

    let slice = extract_slice(text, shape)?;
    let value = serde_json::from_str::<Value>(slice).ok()?;
    shape_ok(&value, shape).then_some(value)
}

/// Detects the known `{"response": "..."}` wrapper emitted by the tool and
/// substitutes the inner text. Returns `None` when the input is not wrapped.
fn unwrap_envelope(raw: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(raw).ok()?;
    let inner = value.as_object()?.get("response")?.as_str()?;
    Some(inner.to_string())
}

/// Shape validation: only the array expectation is strict. An object slice
/// that parses is an object by construction, and unstructured accepts any
/// JSON value.
fn shape_ok(value: &Value, shape: ExpectedShape) -> bool {
    match shape {
        ExpectedShape::JsonArray => value.is_array(),
        ExpectedShape::JsonObject | ExpectedShape::Unstructured => true,
    }
}

/// Slices the candidate JSON payload out of noisy text: from the first
/// opening bracket to the last matching closing bracket.
fn extract_slice(text: &str, shape: ExpectedShape) -> Option<&str> {
    let (open, close) = match shape {
        ExpectedShape::JsonArray => ('[', ']'),
        ExpectedShape::JsonObject => ('{', '}'),
        ExpectedShape::Unstructured => first_complete_pair(text)?,
    };
    slice_pair(text, open, close)
}

/// For unstructured output, picks whichever bracket pair opens first and is
/// complete (has a closer after the opener).
fn first_complete_pair(text: &str) -> Option<(char, char)> {
    let brace = complete_at(text, '{', '}');
    let bracket = complete_at(text, '[', ']');
    match (brace, bracket) {
        (Some(b), Some(a)) => Some(if b <= a { ('{', '}') } else { ('[', ']') }),
        (Some(_), None) => Some(('{', '}')),
        (None, Some(_)) => Some(('[', ']')),
        (None, None) => None,
    }
}

/// Returns the opener's byte offset if `open` appears and a matching `close`
/// follows it.
fn complete_at(text: &str, open: char, close: char) -> Option<usize> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then_some(start)
}

fn slice_pair(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_object() {
        let v = parse("```json\n{\"a\":1}\n```", ExpectedShape::JsonObject);
        assert_eq!(v, Some(json!({"a": 1})));
    }

    #[test]
    fn array_in_prose() {
        let v = parse("noise [1,2,3] noise", ExpectedShape::JsonArray);
        assert_eq!(v, Some(json!([1, 2, 3])));
    }

    #[test]
    fn response_envelope() {
        let v = parse(r#"{"response":"[1,2]"}"#, ExpectedShape::JsonArray);
        assert_eq!(v, Some(json!([1, 2])));
    }

    #[test]
    fn garbage_yields_none() {
        assert_eq!(parse("not json at all", ExpectedShape::JsonArray), None);
    }

    #[test]
    fn clean_array_direct() {
        let v = parse("[true, false]", ExpectedShape::JsonArray);
        assert_eq!(v, Some(json!([true, false])));
    }

    #[test]
    fn clean_object_direct() {
        let v = parse(r#"{"q": "what?", "a": 4}"#, ExpectedShape::JsonObject);
        assert_eq!(v, Some(json!({"q": "what?", "a": 4})));
    }

    #[test]
    fn array_expected_but_object_found() {
        // Direct parse yields an object, shape check fails, and the fallback
        // bracket slice cannot produce an array either.
        assert_eq!(parse(r#"{"a":1}"#, ExpectedShape::JsonArray), None);
    }

    #[test]
    fn array_embedded_next_to_object_noise() {
        let text = r#"Here you go: [{"q":1},{"q":2}] -- enjoy"#;
        let v = parse(text, ExpectedShape::JsonArray);
        assert_eq!(v, Some(json!([{"q": 1}, {"q": 2}])));
    }

    #[test]
    fn envelope_with_fenced_payload() {
        let wrapped = json!({"response": "```json\n{\"ok\":true}\n```"}).to_string();
        let v = parse(&wrapped, ExpectedShape::JsonObject);
        assert_eq!(v, Some(json!({"ok": true})));
    }

    #[test]
    fn envelope_without_string_response_is_kept() {
        // "response" is not a string, so the envelope is NOT unwrapped and
        // the whole object is the payload.
        let text = r#"{"response": 42}"#;
        let v = parse(text, ExpectedShape::JsonObject);
        assert_eq!(v, Some(json!({"response": 42})));
    }

    #[test]
    fn unstructured_picks_first_complete_pair() {
        let v = parse("x [1,2] then {\"a\":1}", ExpectedShape::Unstructured);
        assert_eq!(v, Some(json!([1, 2])));
    }

    #[test]
    fn unstructured_object_first() {
        let v = parse("note {\"a\":1} tail", ExpectedShape::Unstructured);
        assert_eq!(v, Some(json!({"a": 1})));
    }

    #[test]
    fn empty_input_yields_none() {
        assert_eq!(parse("", ExpectedShape::JsonObject), None);
        assert_eq!(parse("", ExpectedShape::Unstructured), None);
    }

    #[test]
    fn unbalanced_brackets_yield_none() {
        assert_eq!(parse("start [1,2,3 and no end", ExpectedShape::JsonArray), None);
    }
}
