#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod builder;
mod convert;
mod error;
mod extract;
mod layout;
mod registry;
mod validate;

#[doc(hidden)]
pub mod prelude;

use comfyx_core::graph::Graph;

pub use crate::builder::GraphBuilder;
pub use crate::convert::{convert_workflow, is_execution_form, to_execution_form};
pub use crate::error::{Error, Result};
pub use crate::extract::extract_workflow_json;
pub use crate::layout::{
    LayoutOptions, LayoutOptionsBuilder, LayoutOptionsBuilderError, LayoutReport, layout,
};
pub use crate::registry::{
    COMBO_TYPE, NodeDefinition, NodeInput, NodeOutput, NodeRegistry, UNCATEGORIZED,
};
pub use crate::validate::{format_workflow, is_workflow, validate_workflow};

/// Tracing target for text extraction.
pub const TRACING_TARGET_EXTRACT: &str = "comfyx_workflow::extract";

/// Tracing target for validation.
pub const TRACING_TARGET_VALIDATE: &str = "comfyx_workflow::validate";

/// Tracing target for format conversion.
pub const TRACING_TARGET_CONVERT: &str = "comfyx_workflow::convert";

/// Tracing target for graph construction.
pub const TRACING_TARGET_BUILDER: &str = "comfyx_workflow::builder";

/// Tracing target for layout.
pub const TRACING_TARGET_LAYOUT: &str = "comfyx_workflow::layout";

/// Tracing target for the node registry.
pub const TRACING_TARGET_REGISTRY: &str = "comfyx_workflow::registry";

/// Loads workflow text in either form into a laid out graph.
///
/// Editor-form text is converted first. Text that cannot be converted
/// yields an empty graph.
pub fn load_display_graph(text: &str) -> Graph {
    load_display_graph_with(text, GraphBuilder::new(), &LayoutOptions::default())
}

/// Like [`load_display_graph`] with an explicit builder and layout options.
pub fn load_display_graph_with(
    text: &str,
    builder: GraphBuilder<'_>,
    options: &LayoutOptions,
) -> Graph {
    let Some(execution) = convert_workflow(text) else {
        return Graph::new();
    };

    let mut graph = builder.parse(&execution);
    layout(&mut graph, options);
    graph
}
