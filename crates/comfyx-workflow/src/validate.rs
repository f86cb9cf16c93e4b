//! Loose shape check for execution-form workflow documents.

use comfyx_core::CLASS_TYPE_KEY;
use serde_json::{Map, Value};

use crate::TRACING_TARGET_VALIDATE;

/// Returns whether `value` looks like an execution-form workflow.
///
/// This only checks that some property of the root object is itself an
/// object carrying a `class_type` key. Semantically broken graphs pass and
/// are rejected later by the job engine.
pub fn is_workflow(value: &Value) -> bool {
    value.as_object().is_some_and(has_class_type_node)
}

/// Parses `text` and applies [`is_workflow`]; malformed JSON yields `false`.
pub fn validate_workflow(text: &str) -> bool {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => is_workflow(&value),
        Err(err) => {
            tracing::debug!(
                target: TRACING_TARGET_VALIDATE,
                error = %err,
                "workflow text is not valid json"
            );
            false
        }
    }
}

/// Pretty-prints a JSON document, returning it unchanged when it does not parse.
pub fn format_workflow(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| text.to_owned())
}

pub(crate) fn has_class_type_node(root: &Map<String, Value>) -> bool {
    root.values()
        .any(|value| value.as_object().is_some_and(|node| node.contains_key(CLASS_TYPE_KEY)))
}
