//! Typed workflow graph.
//!
//! A [`Graph`] is the normalised form of a workflow document. It owns its
//! nodes (which own their ports) and the connections between them. Graphs are
//! rebuilt from scratch on every load; there is no incremental mutation
//! contract beyond what layout needs.

mod accent;
mod geometry;
mod node;
mod port;
mod value;

use std::collections::HashMap;

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

pub use self::accent::AccentCategory;
pub use self::geometry::{Position, Size};
pub use self::node::{DEFAULT_NODE_HEIGHT, DEFAULT_NODE_WIDTH, Node, NodeId};
pub use self::port::{ANY_TYPE, Connection, Port, PortSource};
pub use self::value::WidgetValue;

/// A directed, possibly cyclic, graph of nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
}

impl Graph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of connections in the graph.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Returns whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a node.
    ///
    /// Returns `false` and keeps the existing node when the ID is taken.
    pub fn push_node(&mut self, node: Node) -> bool {
        if self.contains_node(&node.id) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Adds a connection.
    ///
    /// Returns `false` and drops the connection when either endpoint is not
    /// part of the graph.
    pub fn connect(&mut self, connection: Connection) -> bool {
        if !self.contains_node(&connection.from) || !self.contains_node(&connection.to) {
            return false;
        }
        self.connections.push(connection);
        true
    }

    /// Returns the position of a node in insertion order.
    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| &node.id == id)
    }

    /// Returns a reference to a node.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    /// Returns a mutable reference to a node.
    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| &node.id == id)
    }

    /// Returns whether a node exists.
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|node| &node.id == id)
    }

    /// Returns the nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns mutable access to the nodes in insertion order.
    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    /// Returns all connections.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Returns connections originating from a node.
    pub fn outgoing<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| &c.from == id)
    }

    /// Returns connections targeting a node.
    pub fn incoming<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| &c.to == id)
    }

    /// Builds a petgraph view keyed by node position.
    ///
    /// Node weights are the node IDs, edge weights the `(from_slot, to_slot)` pair.
    pub fn to_digraph(&self) -> DiGraph<NodeId, (usize, usize)> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.connections.len());
        let indices: HashMap<&NodeId, NodeIndex> = self
            .nodes
            .iter()
            .map(|node| (&node.id, graph.add_node(node.id.clone())))
            .collect();

        for connection in &self.connections {
            if let (Some(from), Some(to)) =
                (indices.get(&connection.from), indices.get(&connection.to))
            {
                graph.add_edge(*from, *to, (connection.from_slot, connection.to_slot));
            }
        }

        graph
    }

    /// Returns whether the connections form at least one cycle.
    pub fn is_cyclic(&self) -> bool {
        is_cyclic_directed(&self.to_digraph())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_node_graph() -> Graph {
        let mut graph = Graph::new();
        graph.push_node(Node::new("1", "LoadImage"));
        graph.push_node(Node::new("2", "SaveImage"));
        graph
    }

    #[test]
    fn test_graph_new() {
        let graph = Graph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn test_push_node_rejects_duplicate() {
        let mut graph = two_node_graph();
        assert!(!graph.push_node(Node::new("1", "Other")));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.node(&"1".into()).unwrap().class_type, "LoadImage");
    }

    #[test]
    fn test_connect_drops_dangling() {
        let mut graph = two_node_graph();
        assert!(graph.connect(Connection::new("1", 0, "2", 0)));
        assert!(!graph.connect(Connection::new("9", 0, "2", 1)));
        assert!(!graph.connect(Connection::new("1", 0, "9", 0)));
        assert_eq!(graph.connection_count(), 1);
    }

    #[test]
    fn test_incoming_outgoing() {
        let mut graph = two_node_graph();
        graph.push_node(Node::new("3", "PreviewImage"));
        graph.connect(Connection::new("1", 0, "2", 0));
        graph.connect(Connection::new("1", 0, "3", 0));

        let one = NodeId::new("1");
        let two = NodeId::new("2");
        assert_eq!(graph.outgoing(&one).count(), 2);
        assert_eq!(graph.incoming(&two).count(), 1);
        assert_eq!(graph.incoming(&one).count(), 0);
    }

    #[test]
    fn test_is_cyclic() {
        let mut graph = two_node_graph();
        graph.connect(Connection::new("1", 0, "2", 0));
        assert!(!graph.is_cyclic());

        graph.connect(Connection::new("2", 0, "1", 0));
        assert!(graph.is_cyclic());
    }

    #[test]
    fn test_to_digraph() {
        let mut graph = two_node_graph();
        graph.connect(Connection::new("1", 2, "2", 1));

        let digraph = graph.to_digraph();
        assert_eq!(digraph.node_count(), 2);
        assert_eq!(digraph.edge_count(), 1);
        assert_eq!(digraph.edge_weights().next(), Some(&(2, 1)));
    }
}
