//! Ports and connections between nodes.

use serde::{Deserialize, Serialize};

use super::node::NodeId;

/// Declared type used when the real type is unknown.
pub const ANY_TYPE: &str = "any";

/// The output a connected input port reads from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortSource {
    /// Node producing the value.
    pub node_id: NodeId,
    /// Output slot on that node.
    pub slot: usize,
}

impl PortSource {
    /// Creates a new port source.
    pub fn new(node_id: impl Into<NodeId>, slot: usize) -> Self {
        Self {
            node_id: node_id.into(),
            slot,
        }
    }
}

/// An input or output port of a node.
///
/// An input has at most one source; an output may feed any number of inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Port name.
    pub name: String,
    /// Declared type, [`ANY_TYPE`] when unknown.
    pub declared_type: String,
    /// Source of an input port, `None` when unconnected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PortSource>,
}

impl Port {
    /// Creates an unconnected port of unknown type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: ANY_TYPE.to_owned(),
            source: None,
        }
    }

    /// Creates an input port wired to the given source.
    pub fn connected(name: impl Into<String>, source: PortSource) -> Self {
        Self {
            source: Some(source),
            ..Self::new(name)
        }
    }

    /// Sets the declared type.
    #[must_use]
    pub fn with_type(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = declared_type.into();
        self
    }

    /// Returns whether the port is wired to another node.
    pub const fn is_connected(&self) -> bool {
        self.source.is_some()
    }
}

/// A directed connection from an output slot to an input slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Source node.
    pub from: NodeId,
    /// Output slot on the source node.
    pub from_slot: usize,
    /// Target node.
    pub to: NodeId,
    /// Input slot on the target node.
    pub to_slot: usize,
}

impl Connection {
    /// Creates a new connection.
    pub fn new(
        from: impl Into<NodeId>,
        from_slot: usize,
        to: impl Into<NodeId>,
        to_slot: usize,
    ) -> Self {
        Self {
            from: from.into(),
            from_slot,
            to: to.into(),
            to_slot,
        }
    }
}
