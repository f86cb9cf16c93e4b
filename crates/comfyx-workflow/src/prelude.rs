//! Prelude module for convenient imports.
//!
//! ```rust
//! use comfyx_workflow::prelude::*;
//! ```

pub use crate::{
    Error, GraphBuilder, LayoutOptions, LayoutReport, NodeDefinition, NodeRegistry, Result,
    convert_workflow, extract_workflow_json, load_display_graph, validate_workflow,
};
