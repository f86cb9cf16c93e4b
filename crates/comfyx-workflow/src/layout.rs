//! Deterministic column layout for workflow graphs.

use std::collections::{BTreeMap, HashMap};

use comfyx_core::ErrorKind;
use comfyx_core::graph::{Graph, NodeId, Position, Size};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_LAYOUT;

/// Spacing and sizing constants used by [`layout`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(
    name = "LayoutOptionsBuilder",
    pattern = "owned",
    setter(prefix = "with"),
    build_fn(validate = "Self::validate")
)]
pub struct LayoutOptions {
    /// X coordinate of the first column.
    #[builder(default = "60.0")]
    pub start_x: f32,
    /// Y coordinate of the first row.
    #[builder(default = "60.0")]
    pub start_y: f32,
    /// Horizontal distance between columns.
    #[builder(default = "280.0")]
    pub column_spacing: f32,
    /// Vertical distance between rows.
    #[builder(default = "160.0")]
    pub row_spacing: f32,
    /// Width assigned to every node.
    #[builder(default = "220.0")]
    pub node_width: f32,
    /// Minimum node height.
    #[builder(default = "80.0")]
    pub min_height: f32,
    /// Height of the node header.
    #[builder(default = "50.0")]
    pub header_height: f32,
    /// Height of a single port or widget row.
    #[builder(default = "22.0")]
    pub row_height: f32,
}

impl LayoutOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        let positive = [
            ("column_spacing", self.column_spacing),
            ("row_spacing", self.row_spacing),
            ("node_width", self.node_width),
            ("min_height", self.min_height),
        ];
        for (name, value) in positive {
            if let Some(value) = value
                && !(value.is_finite() && value > 0.0)
            {
                return Err(format!("{name} must be a positive number"));
            }
        }

        let non_negative = [
            ("header_height", self.header_height),
            ("row_height", self.row_height),
        ];
        for (name, value) in non_negative {
            if let Some(value) = value
                && !(value.is_finite() && value >= 0.0)
            {
                return Err(format!("{name} must not be negative"));
            }
        }

        Ok(())
    }
}

impl LayoutOptions {
    /// Returns a builder for layout options.
    pub fn builder() -> LayoutOptionsBuilder {
        LayoutOptionsBuilder::default()
    }

    /// Height of a node with the given number of wired inputs and widgets.
    pub fn node_height(&self, connected_inputs: usize, widgets: usize) -> f32 {
        let rows = connected_inputs.max(1) + widgets;
        (self.header_height + rows as f32 * self.row_height).max(self.min_height)
    }
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            start_x: 60.0,
            start_y: 60.0,
            column_spacing: 280.0,
            row_spacing: 160.0,
            node_width: 220.0,
            min_height: 80.0,
            header_height: 50.0,
            row_height: 22.0,
        }
    }
}

/// Summary of a layout run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutReport {
    /// Number of distinct columns.
    pub columns: usize,
    /// Relaxation passes performed.
    pub passes: usize,
    /// Whether depths settled within the pass budget.
    pub converged: bool,
    /// Whether the graph contains a cycle.
    pub cyclic: bool,
}

impl LayoutReport {
    /// Returns the failure kind the layout degraded from, if any.
    ///
    /// An exhausted pass budget yields [`ErrorKind::ResourceExhaustion`]; the
    /// positions are still complete.
    pub fn degradation(&self) -> Option<ErrorKind> {
        (!self.converged).then_some(ErrorKind::ResourceExhaustion)
    }
}

/// Assigns a position and size to every node of `graph`.
///
/// Each node's depth is the longest chain of connections leading into it,
/// found by relaxing `depth[to] = max(depth[to], depth[from] + 1)` until a
/// pass changes nothing or `2 × node_count` passes have run. Nodes of equal
/// depth share a column and are stacked in graph order. On cyclic graphs the
/// budget cuts relaxation short and the layout is complete but approximate.
pub fn layout(graph: &mut Graph, options: &LayoutOptions) -> LayoutReport {
    let node_count = graph.node_count();
    if node_count == 0 {
        return LayoutReport {
            converged: true,
            ..LayoutReport::default()
        };
    }

    let index: HashMap<&NodeId, usize> = graph
        .nodes()
        .iter()
        .enumerate()
        .map(|(position, node)| (&node.id, position))
        .collect();
    let edges: Vec<(usize, usize)> = graph
        .connections()
        .iter()
        .filter_map(|c| Some((*index.get(&c.from)?, *index.get(&c.to)?)))
        .collect();

    let budget = 2 * node_count;
    let mut depth = vec![0usize; node_count];
    let mut passes = 0usize;
    let mut changed = true;

    while changed && passes < budget {
        changed = false;
        passes += 1;
        for &(from, to) in &edges {
            let candidate = depth[from] + 1;
            if candidate > depth[to] {
                depth[to] = candidate;
                changed = true;
            }
        }
    }

    let converged = !changed;
    let cyclic = graph.is_cyclic();

    let mut columns: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (position, &node_depth) in depth.iter().enumerate() {
        columns.entry(node_depth).or_default().push(position);
    }

    let nodes = graph.nodes_mut();
    for (&column_depth, members) in &columns {
        let x = options.start_x + column_depth as f32 * options.column_spacing;
        for (row, &position) in members.iter().enumerate() {
            let node = &mut nodes[position];
            node.position = Position::new(x, options.start_y + row as f32 * options.row_spacing);
            node.size = Size::new(
                options.node_width,
                options.node_height(node.connected_input_count(), node.widget_count()),
            );
        }
    }

    let report = LayoutReport {
        columns: columns.len(),
        passes,
        converged,
        cyclic,
    };

    if converged {
        tracing::debug!(
            target: TRACING_TARGET_LAYOUT,
            node_count,
            columns = report.columns,
            passes,
            "laid out workflow graph"
        );
    } else if let Some(kind) = report.degradation() {
        tracing::warn!(
            target: TRACING_TARGET_LAYOUT,
            kind = %kind,
            node_count,
            passes,
            cyclic,
            "layout pass budget exhausted, using partial depths"
        );
    }

    report
}
