//! Conversion from the editor form to the execution form.
//!
//! The editor form is an object with a `nodes` array and a `links` array:
//!
//! ```json
//! {
//!   "nodes": [{"id": 4, "type": "CheckpointLoaderSimple", "inputs": [], "widgets_values": ["v1.safetensors"]}],
//!   "links": [[1, 4, 0, 3, 0, "MODEL"]]
//! }
//! ```
//!
//! The execution form is a flat object keyed by node id, each value holding
//! `class_type` and `inputs`.

use std::collections::{HashMap, HashSet};

use comfyx_core::CLASS_TYPE_KEY;
use serde_json::{Map, Value};

use crate::validate::has_class_type_node;
use crate::{Error, Result, TRACING_TARGET_CONVERT};

/// Returns whether a document root is already in execution form.
pub fn is_execution_form(root: &Map<String, Value>) -> bool {
    has_class_type_node(root)
}

/// Converts a document to the execution form.
///
/// Execution-form documents are returned unchanged. Editor-form documents
/// are rebuilt node by node; any malformed node fails the whole conversion
/// rather than producing a document with missing nodes.
///
/// Widget values are matched to unlinked widget inputs by position, in input
/// declaration order.
pub fn to_execution_form(document: Value) -> Result<Value> {
    let Value::Object(root) = document else {
        return Err(Error::NotAnObject);
    };

    if is_execution_form(&root) {
        return Ok(Value::Object(root));
    }

    let links = link_table(root.get("links"))?;
    let nodes = root
        .get("nodes")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::missing_field("nodes", "editor workflow"))?;

    let mut seen = HashSet::with_capacity(nodes.len());
    let mut converted = Map::with_capacity(nodes.len());

    for (index, node) in nodes.iter().enumerate() {
        let context = format!("node #{index}");
        let node = node
            .as_object()
            .ok_or_else(|| Error::invalid_field("nodes", &context, "expected an object"))?;

        let id = node
            .get("id")
            .ok_or_else(|| Error::missing_field("id", &context))
            .and_then(|id| {
                id_string(id).ok_or_else(|| {
                    Error::invalid_field("id", &context, "expected a number or string")
                })
            })?;
        let class_type = node
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::missing_field("type", &context))?;

        if !seen.insert(id.clone()) {
            return Err(Error::DuplicateNode { node_id: id });
        }

        let inputs = convert_inputs(node, &links, &id)?;
        let mut body = Map::with_capacity(2);
        body.insert(CLASS_TYPE_KEY.to_owned(), Value::String(class_type.to_owned()));
        body.insert("inputs".to_owned(), Value::Object(inputs));
        converted.insert(id, Value::Object(body));
    }

    tracing::debug!(
        target: TRACING_TARGET_CONVERT,
        node_count = converted.len(),
        link_count = links.len(),
        "converted editor workflow"
    );

    Ok(Value::Object(converted))
}

/// Converts workflow text to execution-form text.
///
/// Text already in execution form is returned byte for byte; converted
/// documents are pretty-printed. Returns `None` when the text does not
/// parse or cannot be converted.
pub fn convert_workflow(text: &str) -> Option<String> {
    let document = match serde_json::from_str::<Value>(text) {
        Ok(document) => document,
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET_CONVERT,
                error = %err,
                "workflow text is not valid json"
            );
            return None;
        }
    };

    if let Value::Object(root) = &document
        && is_execution_form(root)
    {
        return Some(text.to_owned());
    }

    let converted = to_execution_form(document)
        .and_then(|value| serde_json::to_string_pretty(&value).map_err(Error::from));

    match converted {
        Ok(converted) => Some(converted),
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET_CONVERT,
                error = %err,
                kind = %err.kind(),
                "workflow conversion failed"
            );
            None
        }
    }
}

/// Source of a link: node id and output slot.
type LinkSource = (String, u64);

fn link_table(links: Option<&Value>) -> Result<HashMap<i64, LinkSource>> {
    let Some(links) = links.and_then(Value::as_array) else {
        return Ok(HashMap::new());
    };

    let mut table = HashMap::with_capacity(links.len());
    for (index, link) in links.iter().enumerate() {
        let Some(entry) = link.as_array().filter(|entry| entry.len() >= 4) else {
            continue;
        };

        let context = || format!("link #{index}");
        let link_id = entry[0]
            .as_i64()
            .ok_or_else(|| Error::invalid_field("links", context(), "link id must be an integer"))?;
        let source = id_string(&entry[1])
            .ok_or_else(|| Error::invalid_field("links", context(), "invalid source node id"))?;
        let slot = entry[2]
            .as_u64()
            .ok_or_else(|| Error::invalid_field("links", context(), "slot must be an integer"))?;

        table.insert(link_id, (source, slot));
    }

    Ok(table)
}

fn convert_inputs(
    node: &Map<String, Value>,
    links: &HashMap<i64, LinkSource>,
    node_id: &str,
) -> Result<Map<String, Value>> {
    let mut inputs = Map::new();
    let Some(declared) = node.get("inputs").and_then(Value::as_array) else {
        return Ok(inputs);
    };

    let widgets = node
        .get("widgets_values")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let mut widget_index = 0usize;

    for input in declared {
        let name = input
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::missing_field("name", format!("input of node {node_id}")))?;

        match input.get("link").filter(|link| !link.is_null()) {
            Some(link) => {
                let link_id = link.as_i64().ok_or_else(|| {
                    let context = format!("input `{name}` of node {node_id}");
                    Error::invalid_field("link", context, "expected an integer")
                })?;
                match links.get(&link_id) {
                    Some((source, slot)) => {
                        inputs.insert(
                            name.to_owned(),
                            Value::Array(vec![Value::String(source.clone()), Value::from(*slot)]),
                        );
                    }
                    None => tracing::debug!(
                        target: TRACING_TARGET_CONVERT,
                        node_id,
                        input = name,
                        link_id,
                        "input references an unknown link"
                    ),
                }
            }
            None if input.get("widget").is_some_and(|widget| !widget.is_null()) => {
                if let Some(value) = widgets.get(widget_index) {
                    inputs.insert(name.to_owned(), value.clone());
                }
                widget_index += 1;
            }
            None => {}
        }
    }

    Ok(inputs)
}

fn id_string(id: &Value) -> Option<String> {
    match id {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) if id.is_i64() || id.is_u64() => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn editor_document() -> Value {
        json!({
            "nodes": [
                {"id": 4, "type": "CheckpointLoaderSimple", "inputs": [], "widgets_values": ["v1.safetensors"]},
                {
                    "id": 3,
                    "type": "KSampler",
                    "inputs": [
                        {"name": "model", "type": "MODEL", "link": 1},
                        {"name": "seed", "type": "INT", "link": null, "widget": {"name": "seed"}},
                        {"name": "steps", "type": "INT", "widget": {"name": "steps"}}
                    ],
                    "widgets_values": [42, 20]
                }
            ],
            "links": [[1, 4, 0, 3, 0, "MODEL"]]
        })
    }

    #[test]
    fn test_execution_form_is_identity() {
        let document = json!({"1": {"class_type": "X", "inputs": {"a": 1}}});
        assert_eq!(to_execution_form(document.clone()).unwrap(), document);
    }

    #[test]
    fn test_convert_editor_form() {
        let converted = to_execution_form(editor_document()).unwrap();
        assert_eq!(
            converted,
            json!({
                "4": {"class_type": "CheckpointLoaderSimple", "inputs": {}},
                "3": {"class_type": "KSampler", "inputs": {"model": ["4", 0], "seed": 42, "steps": 20}}
            })
        );
    }

    #[test]
    fn test_widget_counter_advances_past_exhausted_values() {
        let document = json!({
            "nodes": [{
                "id": 1,
                "type": "Sampler",
                "inputs": [
                    {"name": "a", "widget": {}},
                    {"name": "b", "widget": {}},
                    {"name": "c", "widget": {}}
                ],
                "widgets_values": [1]
            }]
        });
        let converted = to_execution_form(document).unwrap();
        assert_eq!(converted["1"]["inputs"], json!({"a": 1}));
    }

    #[test]
    fn test_unknown_link_leaves_input_absent() {
        let document = json!({
            "nodes": [{"id": 2, "type": "Save", "inputs": [{"name": "image", "link": 99, "widget": {}}], "widgets_values": ["x"]}],
            "links": [[5, 1]]
        });
        let converted = to_execution_form(document).unwrap();
        assert_eq!(converted["2"]["inputs"], json!({}));
    }

    #[test]
    fn test_conversion_failures() {
        assert!(matches!(
            to_execution_form(json!({"nodes": [{"type": "X"}]})),
            Err(Error::MissingField { field: "id", .. })
        ));
        assert!(matches!(
            to_execution_form(json!({"nodes": [{"id": 1}]})),
            Err(Error::MissingField { field: "type", .. })
        ));
        assert!(matches!(
            to_execution_form(json!({"nodes": [{"id": 1, "type": "A"}, {"id": "1", "type": "B"}]})),
            Err(Error::DuplicateNode { .. })
        ));
        assert!(matches!(
            to_execution_form(json!({"links": []})),
            Err(Error::MissingField { field: "nodes", .. })
        ));
        assert!(matches!(to_execution_form(json!([])), Err(Error::NotAnObject)));
    }

    #[test]
    fn test_convert_workflow_text() {
        let execution = r#"{"1": {"class_type": "X", "inputs": {}}}"#;
        assert_eq!(convert_workflow(execution).as_deref(), Some(execution));

        let editor = editor_document().to_string();
        let converted = convert_workflow(&editor).unwrap();
        let value: Value = serde_json::from_str(&converted).unwrap();
        assert_eq!(value["3"]["inputs"]["model"], json!(["4", 0]));

        assert_eq!(convert_workflow("{"), None);
        assert_eq!(convert_workflow(r#"{"nodes": [{"id": 1}]}"#), None);
    }
}
