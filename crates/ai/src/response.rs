//! Decoding model replies.

use deck_core::{Error, Result};
use serde_json::Value;

/// Fields read from a model reply. `None` means absent or null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReply {
    pub content: Option<String>,
    pub summary: Option<String>,
    pub key_points: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

/// The text from the first `{` to the last `}`, or the whole text when there
/// is no such span.
pub fn extract_json_block(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start <= end => &text[start..=end],
        _ => text,
    }
}

/// Decode a reply into its four fields.
///
/// The JSON block must decode to an object. Non-string values are kept in
/// their JSON form, and a lone value where a list is expected becomes a
/// one-item list.
pub fn parse_reply(reply: &str) -> Result<ParsedReply> {
    let block = extract_json_block(reply);
    let value: Value =
        serde_json::from_str(block).map_err(|e| Error::ResponseParseError(e.to_string()))?;

    let Value::Object(map) = value else {
        return Err(Error::ResponseParseError("reply is not a JSON object".to_string()));
    };

    Ok(ParsedReply {
        content: map.get("content").and_then(string_field),
        summary: map.get("summary").and_then(string_field),
        key_points: map.get("key_points").and_then(list_field),
        tags: map.get("tags").and_then(list_field),
    })
}

fn string_field(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn list_field(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(items.iter().filter_map(string_field).collect()),
        other => string_field(other).map(|s| vec![s]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_block() {
        assert_eq!(extract_json_block("Sure! {\"a\": {\"b\": 1}} Hope that helps."), "{\"a\": {\"b\": 1}}");
        assert_eq!(extract_json_block("no braces here"), "no braces here");
        assert_eq!(extract_json_block("} backwards {"), "} backwards {");
        assert_eq!(extract_json_block("{}"), "{}");
    }

    #[test]
    fn test_parse_full_reply() {
        let reply = r#"Here you go:
{"content": "Welcome text", "summary": "Intro", "key_points": ["A", "B"], "tags": ["onboarding"]}"#;
        let parsed = parse_reply(reply).unwrap();
        assert_eq!(parsed.content.as_deref(), Some("Welcome text"));
        assert_eq!(parsed.summary.as_deref(), Some("Intro"));
        assert_eq!(parsed.key_points, Some(vec!["A".to_string(), "B".to_string()]));
        assert_eq!(parsed.tags, Some(vec!["onboarding".to_string()]));
    }

    #[test]
    fn test_missing_and_null_fields_are_none() {
        let parsed = parse_reply(r#"{"summary": null, "tags": []}"#).unwrap();
        assert_eq!(parsed.content, None);
        assert_eq!(parsed.summary, None);
        assert_eq!(parsed.key_points, None);
        assert_eq!(parsed.tags, Some(Vec::new()));
    }

    #[test]
    fn test_non_string_values_are_stringified() {
        let parsed = parse_reply(r#"{"content": 42, "key_points": [1, "two", null], "tags": "solo"}"#).unwrap();
        assert_eq!(parsed.content.as_deref(), Some("42"));
        assert_eq!(parsed.key_points, Some(vec!["1".to_string(), "two".to_string()]));
        assert_eq!(parsed.tags, Some(vec!["solo".to_string()]));
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(matches!(parse_reply("[1, 2]"), Err(Error::ResponseParseError(_))));
        assert!(matches!(parse_reply("plain prose"), Err(Error::ResponseParseError(_))));
        assert!(matches!(parse_reply("{not json}"), Err(Error::ResponseParseError(_))));
    }
}
