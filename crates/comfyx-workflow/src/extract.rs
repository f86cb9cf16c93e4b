//! Extraction of a workflow JSON object from free-form text.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::TRACING_TARGET_EXTRACT;

/// First fenced code block, optionally tagged `json`.
fn fenced_block() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)```").ok())
        .as_ref()
}

/// Extracts the JSON object most likely to be a workflow from `text`.
///
/// The first fenced code block wins when its trimmed content is a JSON
/// object. Otherwise the text is scanned from its first `{` for a balanced
/// object, skipping braces inside string literals. Returns `None` when
/// neither candidate parses as an object.
pub fn extract_workflow_json(text: &str) -> Option<&str> {
    if text.trim().is_empty() {
        return None;
    }

    let fenced = fenced_block()
        .and_then(|re| re.captures(text))
        .and_then(|captures| captures.get(1))
        .map(|content| content.as_str().trim())
        .filter(|content| content.starts_with('{') && is_json_object(content));

    if let Some(content) = fenced {
        tracing::debug!(
            target: TRACING_TARGET_EXTRACT,
            len = content.len(),
            "extracted workflow from fenced block"
        );
        return Some(content);
    }

    let span = balanced_object(text).filter(|span| is_json_object(span));
    match span {
        Some(span) => tracing::debug!(
            target: TRACING_TARGET_EXTRACT,
            len = span.len(),
            "extracted workflow from raw text"
        ),
        None => tracing::debug!(
            target: TRACING_TARGET_EXTRACT,
            "no workflow object found in text"
        ),
    }
    span
}

/// Returns the span from the first `{` to its matching `}`.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    // Delimiters are ASCII, so byte offsets always land on char boundaries.
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

fn is_json_object(text: &str) -> bool {
    serde_json::from_str::<Map<String, Value>>(text).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_fenced_json() {
        let text = "Here is your workflow:\n```json\n{\"1\":{\"class_type\":\"X\",\"inputs\":{}}}\n```\nEnjoy!";
        assert_eq!(
            extract_workflow_json(text),
            Some(r#"{"1":{"class_type":"X","inputs":{}}}"#)
        );
    }

    #[test]
    fn test_extract_untagged_fence() {
        let text = "```\n  {\"a\": 1}  \n```";
        assert_eq!(extract_workflow_json(text), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_extract_raw_with_braces_in_strings() {
        let text = r#"Sure! {"1": {"class_type": "Note", "inputs": {"text": "{not a brace}"}}} done"#;
        assert_eq!(
            extract_workflow_json(text),
            Some(r#"{"1": {"class_type": "Note", "inputs": {"text": "{not a brace}"}}}"#)
        );
    }

    #[test]
    fn test_extract_raw_with_escaped_quotes() {
        let text = r#"{"a": "say \"}\" twice"} trailing"#;
        assert_eq!(extract_workflow_json(text), Some(r#"{"a": "say \"}\" twice"}"#));
    }

    #[test]
    fn test_extract_invalid_fence_falls_back_to_raw_scan() {
        let text = "```\nnot json\n```\nbut here: {\"k\": true}";
        assert_eq!(extract_workflow_json(text), Some(r#"{"k": true}"#));
    }

    #[test]
    fn test_extract_not_found() {
        assert_eq!(extract_workflow_json(""), None);
        assert_eq!(extract_workflow_json("   \n"), None);
        assert_eq!(extract_workflow_json("no json here"), None);
        assert_eq!(extract_workflow_json("{ unbalanced"), None);
        assert_eq!(extract_workflow_json("{not: json}"), None);
    }

    #[test]
    fn test_extract_multibyte_text() {
        let text = "résumé → {\"név\": \"ő\"} ✓";
        assert_eq!(extract_workflow_json(text), Some("{\"név\": \"ő\"}"));
    }
}
