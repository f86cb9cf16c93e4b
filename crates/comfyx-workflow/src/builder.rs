//! Construction of the typed graph from an execution-form document.

use std::collections::HashMap;

use comfyx_core::CLASS_TYPE_KEY;
use comfyx_core::graph::{ANY_TYPE, Connection, Graph, Node, NodeId, Port, PortSource, WidgetValue};
use serde_json::{Map, Value};

use crate::TRACING_TARGET_BUILDER;
use crate::registry::{NodeDefinition, NodeRegistry};

/// Builds [`Graph`]s from execution-form workflow documents.
///
/// Input port order follows the document's key order, and a connection's
/// target slot is the position of its port in that order. With a registry,
/// declared port types and outputs come from the node definitions; without
/// one, outputs are synthesised up to the highest slot any connection uses.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder<'a> {
    registry: Option<&'a NodeRegistry>,
}

impl<'a> GraphBuilder<'a> {
    /// Creates a builder without type information.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder that types ports from `registry`.
    pub fn with_registry(registry: &'a NodeRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    /// Parses workflow text, returning an empty graph when it is not valid JSON.
    pub fn parse(&self, text: &str) -> Graph {
        match serde_json::from_str::<Value>(text) {
            Ok(document) => self.build(&document),
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_BUILDER,
                    error = %err,
                    "workflow text is not valid json"
                );
                Graph::new()
            }
        }
    }

    /// Builds a graph from an execution-form document.
    ///
    /// Non-object entries are skipped and connections from unknown nodes are
    /// dropped. A non-object root yields an empty graph.
    pub fn build(&self, document: &Value) -> Graph {
        let Some(root) = document.as_object() else {
            tracing::warn!(
                target: TRACING_TARGET_BUILDER,
                "workflow document is not an object"
            );
            return Graph::new();
        };

        let mut graph = Graph::new();
        let mut pending = Vec::new();

        for (id, body) in root {
            let Some(body) = body.as_object() else {
                continue;
            };
            let node = self.build_node(id, body, &mut pending);
            graph.push_node(node);
        }

        synthesize_outputs(&mut graph, &pending);

        let mut dropped = 0usize;
        for connection in pending {
            if !graph.connect(connection) {
                dropped += 1;
            }
        }

        if dropped > 0 {
            tracing::debug!(
                target: TRACING_TARGET_BUILDER,
                dropped,
                "dropped connections with missing endpoints"
            );
        }

        tracing::debug!(
            target: TRACING_TARGET_BUILDER,
            node_count = graph.node_count(),
            connection_count = graph.connection_count(),
            "built workflow graph"
        );

        graph
    }

    fn build_node(
        &self,
        id: &str,
        body: &Map<String, Value>,
        pending: &mut Vec<Connection>,
    ) -> Node {
        let class_type = body
            .get(CLASS_TYPE_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default();
        let definition = self.registry.and_then(|registry| registry.get(class_type));

        let mut node = Node::new(id, class_type);
        let title = body
            .get("_meta")
            .and_then(|meta| meta.get("title"))
            .and_then(Value::as_str)
            .filter(|title| !title.is_empty());
        if let Some(title) = title {
            node = node.with_title(title);
        }

        if let Some(inputs) = body.get("inputs").and_then(Value::as_object) {
            for (name, value) in inputs {
                let declared_type = input_type(definition, name);
                match parse_link(value) {
                    Some(source) => {
                        let port = Port::connected(name, source.clone()).with_type(declared_type);
                        let to_slot = node.push_input(port);
                        pending.push(Connection::new(source.node_id, source.slot, id, to_slot));
                    }
                    None => {
                        node.push_input(Port::new(name).with_type(declared_type));
                        if let Some(widget) = WidgetValue::from_json(value) {
                            node.set_widget(name, widget);
                        }
                    }
                }
            }
        }

        if let Some(definition) = definition {
            for output in &definition.outputs {
                node.push_output(Port::new(&output.name).with_type(&output.type_name));
            }
        }

        node
    }
}

fn input_type<'d>(definition: Option<&'d NodeDefinition>, name: &str) -> &'d str {
    definition
        .and_then(|definition| definition.input(name))
        .map_or(ANY_TYPE, |input| input.type_name.as_str())
}

/// Parses `[source_id, slot]` where the id is a string or an integer.
fn parse_link(value: &Value) -> Option<PortSource> {
    let [source, slot] = value.as_array()?.as_slice() else {
        return None;
    };

    let source = match source {
        Value::String(id) => NodeId::new(id.as_str()),
        Value::Number(id) if id.is_i64() || id.is_u64() => NodeId::new(id.to_string()),
        _ => return None,
    };
    let slot = usize::try_from(slot.as_u64()?).ok()?;

    Some(PortSource::new(source, slot))
}

/// Gives untyped nodes enough outputs for every slot their connections use.
fn synthesize_outputs(graph: &mut Graph, connections: &[Connection]) {
    let mut highest: HashMap<&NodeId, usize> = HashMap::new();
    for connection in connections {
        let slot = highest.entry(&connection.from).or_default();
        *slot = (*slot).max(connection.from_slot);
    }

    for node in graph.nodes_mut() {
        if !node.outputs.is_empty() {
            continue;
        }
        if let Some(&max_slot) = highest.get(&node.id) {
            for slot in 0..=max_slot {
                node.push_output(Port::new(format!("output_{slot}")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_build_two_nodes() {
        let document = json!({
            "1": {"class_type": "LoadImage", "inputs": {"path": "a.png"}},
            "2": {"class_type": "Save", "inputs": {"image": ["1", 0]}}
        });
        let graph = GraphBuilder::new().build(&document);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.connections(), &[Connection::new("1", 0, "2", 0)]);

        let load = graph.node(&"1".into()).unwrap();
        assert_eq!(load.widget("path"), Some(&WidgetValue::from("a.png")));
        assert_eq!(load.outputs.len(), 1);
        assert_eq!(load.outputs[0].name, "output_0");

        let save = graph.node(&"2".into()).unwrap();
        assert!(save.inputs[0].is_connected());
    }

    #[test]
    fn test_target_slot_is_port_position() {
        let document = json!({
            "4": {"class_type": "Loader", "inputs": {}},
            "3": {"class_type": "KSampler", "inputs": {
                "seed": 5,
                "model": ["4", 0],
                "cfg": 7.5,
                "positive": [4, 1]
            }}
        });
        let graph = GraphBuilder::new().build(&document);

        let slots: Vec<_> = graph.connections().iter().map(|c| (c.from_slot, c.to_slot)).collect();
        assert_eq!(slots, [(0, 1), (1, 3)]);

        let sampler = graph.node(&"3".into()).unwrap();
        assert_eq!(sampler.inputs.len(), 4);
        assert_eq!(sampler.widget_count(), 2);
        assert_eq!(sampler.connected_input_count(), 2);
        assert_eq!(graph.node(&"4".into()).unwrap().outputs.len(), 2);
    }

    #[test]
    fn test_title_and_dangling() {
        let document = json!({
            "7": {"class_type": "CLIPTextEncode", "_meta": {"title": "Prompt"}, "inputs": {"clip": ["99", 1]}},
            "ignored": "not a node"
        });
        let graph = GraphBuilder::new().build(&document);

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.connection_count(), 0);
        assert_eq!(graph.node(&"7".into()).unwrap().title, "Prompt");
    }

    #[test]
    fn test_registry_types() {
        let registry = NodeRegistry::from_object_info(&json!({
            "KSampler": {
                "input": {"required": {"model": ["MODEL"], "seed": ["INT"]}},
                "output": ["LATENT"]
            }
        }));
        let document = json!({"3": {"class_type": "KSampler", "inputs": {"seed": 1, "model": ["4", 0]}}});
        let graph = GraphBuilder::with_registry(&registry).build(&document);

        let node = graph.node(&"3".into()).unwrap();
        assert_eq!(node.inputs[0].declared_type, "INT");
        assert_eq!(node.inputs[1].declared_type, "MODEL");
        assert_eq!(node.outputs[0].declared_type, "LATENT");
    }

    #[test]
    fn test_malformed_input_yields_empty_graph() {
        assert!(GraphBuilder::new().parse("{").is_empty());
        assert!(GraphBuilder::new().parse("[1, 2]").is_empty());
        assert!(GraphBuilder::new().parse("{}").is_empty());
    }

    #[test]
    fn test_parse_link_shapes() {
        assert_eq!(parse_link(&json!(["1", 0])), Some(PortSource::new("1", 0)));
        assert_eq!(parse_link(&json!([12, 2])), Some(PortSource::new("12", 2)));
        assert_eq!(parse_link(&json!(["1", -1])), None);
        assert_eq!(parse_link(&json!(["1", 0, 2])), None);
        assert_eq!(parse_link(&json!([1.5, 0])), None);
    }
}
