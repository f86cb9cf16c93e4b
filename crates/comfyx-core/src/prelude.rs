//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use comfyx_core::prelude::*;
//! ```

pub use crate::error::ErrorKind;
pub use crate::event::{ExecutionEvent, Progress};
pub use crate::graph::{
    AccentCategory, Connection, Graph, Node, NodeId, Port, PortSource, Position, Size, WidgetValue,
};
