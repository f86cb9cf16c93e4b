//! Node types.

use std::collections::BTreeMap;

use derive_more::{Debug, Display, From, Into};
use serde::{Deserialize, Serialize};

use super::accent::AccentCategory;
use super::geometry::{Position, Size};
use super::port::Port;
use super::value::WidgetValue;

/// Identifier of a node, unique within a single graph.
///
/// Job engines key nodes by arbitrary strings ("1", "12", "sampler"), so the
/// identifier is kept as text rather than parsed.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Debug, Display, From, Into)]
#[debug("{_0}")]
#[display("{_0}")]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node ID from any string-like value.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Default node width used before layout runs.
pub const DEFAULT_NODE_WIDTH: f32 = 220.0;

/// Default node height used before layout runs.
pub const DEFAULT_NODE_HEIGHT: f32 = 120.0;

/// A typed node of a workflow graph.
///
/// Port order is significant: connections address ports by slot index, not
/// by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Identifier, unique within the owning graph.
    pub id: NodeId,
    /// Operation implemented by the node on the job engine.
    pub class_type: String,
    /// Display label.
    pub title: String,
    /// Input ports in slot order.
    pub inputs: Vec<Port>,
    /// Output ports in slot order.
    pub outputs: Vec<Port>,
    /// Widget values by input name.
    pub widget_values: BTreeMap<String, WidgetValue>,
    /// Top-left corner assigned by layout.
    pub position: Position,
    /// Size assigned by layout.
    pub size: Size,
    /// Display category derived from the class type.
    pub accent: AccentCategory,
}

impl Node {
    /// Creates a node with the class type as its title and no ports.
    pub fn new(id: impl Into<NodeId>, class_type: impl Into<String>) -> Self {
        let class_type = class_type.into();
        Self {
            id: id.into(),
            title: class_type.clone(),
            accent: AccentCategory::from_class_type(&class_type),
            class_type,
            inputs: Vec::new(),
            outputs: Vec::new(),
            widget_values: BTreeMap::new(),
            position: Position::default(),
            size: Size::new(DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT),
        }
    }

    /// Sets the display title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Appends an input port and returns its slot index.
    pub fn push_input(&mut self, port: Port) -> usize {
        self.inputs.push(port);
        self.inputs.len() - 1
    }

    /// Appends an output port and returns its slot index.
    pub fn push_output(&mut self, port: Port) -> usize {
        self.outputs.push(port);
        self.outputs.len() - 1
    }

    /// Stores a widget value under the given input name.
    pub fn set_widget(&mut self, name: impl Into<String>, value: WidgetValue) {
        self.widget_values.insert(name.into(), value);
    }

    /// Returns a widget value by input name.
    pub fn widget(&self, name: &str) -> Option<&WidgetValue> {
        self.widget_values.get(name)
    }

    /// Returns the number of inputs that are wired to another node.
    pub fn connected_input_count(&self) -> usize {
        self.inputs.iter().filter(|port| port.is_connected()).count()
    }

    /// Returns the number of stored widget values.
    pub fn widget_count(&self) -> usize {
        self.widget_values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PortSource;

    #[test]
    fn test_node_new_defaults() {
        let node = Node::new("4", "CheckpointLoaderSimple");
        assert_eq!(node.id, "4");
        assert_eq!(node.title, "CheckpointLoaderSimple");
        assert_eq!(node.accent, AccentCategory::Loader);
        assert_eq!(node.size, Size::new(DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT));
        assert!(node.inputs.is_empty());
    }

    #[test]
    fn test_node_counts() {
        let mut node = Node::new("3", "KSampler").with_title("Sampler");
        node.push_input(Port::connected("model", PortSource::new("4", 0)));
        node.push_input(Port::new("seed"));
        node.set_widget("seed", WidgetValue::Integer(7));
        node.set_widget("cfg", WidgetValue::Float(8.0));

        assert_eq!(node.title, "Sampler");
        assert_eq!(node.connected_input_count(), 1);
        assert_eq!(node.widget_count(), 2);
        assert_eq!(node.widget("seed"), Some(&WidgetValue::Integer(7)));
    }

    #[test]
    fn test_node_id_display_and_serde() {
        let id = NodeId::new("12");
        assert_eq!(id.to_string(), "12");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"12\"");
    }
}
