//! Extraction of the JSON object an agent reply carries.
//!
//! Replies are expected to be a JSON object, possibly wrapped in a Markdown code
//! fence or surrounded by prose. Anything that does not yield an object is
//! reported as [`MalformedPayload`].

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MalformedPayload {
    #[error("no JSON object found in content")]
    NoObject,
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Parse the structured payload out of `text`.
///
/// A surrounding ```` ``` ```` / ```` ```json ```` fence is stripped first;
/// otherwise the outermost `{ ... }` span is parsed.
pub fn extract_structured_payload(text: &str) -> Result<Map<String, Value>, MalformedPayload> {
    let body = strip_code_fence(text.trim()).unwrap_or_else(|| text.trim());

    let start = body.find('{').ok_or(MalformedPayload::NoObject)?;
    let end = body.rfind('}').ok_or(MalformedPayload::NoObject)?;
    if end < start {
        return Err(MalformedPayload::NoObject);
    }

    Ok(serde_json::from_str(&body[start..=end])?)
}

fn strip_code_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    // Info string (e.g. `json`) runs to the end of the opening line.
    let (_, rest) = rest.split_once('\n')?;
    let rest = rest.trim_end();
    Some(rest.strip_suffix("```").unwrap_or(rest).trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_object() {
        let map = extract_structured_payload(r#"{"command": {"name": "ls"}}"#).unwrap();
        assert_eq!(map["command"]["name"], "ls");
    }

    #[test]
    fn fenced_object() {
        let text = "```json\n{\"thoughts\": {\"text\": \"hm\"}, \"command\": {}}\n```";
        let map = extract_structured_payload(text).unwrap();
        assert!(map.contains_key("thoughts"));
        assert!(map.contains_key("command"));
    }

    #[test]
    fn bare_fence_without_info_string() {
        let map = extract_structured_payload("```\n{\"a\": 1}\n```").unwrap();
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn object_surrounded_by_prose() {
        let text = "Sure! Here is my answer: {\"a\": {\"b\": 2}} Hope that helps.";
        let map = extract_structured_payload(text).unwrap();
        assert_eq!(map["a"]["b"], 2);
    }

    #[test]
    fn prose_without_braces_is_malformed() {
        let err = extract_structured_payload("I could not decide.").unwrap_err();
        assert!(matches!(err, MalformedPayload::NoObject));
    }

    #[test]
    fn broken_json_is_malformed() {
        let err = extract_structured_payload("{\"a\": }").unwrap_err();
        assert!(matches!(err, MalformedPayload::InvalidJson(_)));
    }

    #[test]
    fn array_is_not_an_object() {
        let err = extract_structured_payload("```json\n[1, 2]\n```").unwrap_err();
        assert!(matches!(err, MalformedPayload::NoObject));
    }
}
