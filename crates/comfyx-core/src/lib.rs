#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod event;
pub mod graph;

#[doc(hidden)]
pub mod prelude;

pub use error::ErrorKind;
pub use event::{ExecutionEvent, Progress};

/// JSON key that identifies a node's operation in the execution form.
pub const CLASS_TYPE_KEY: &str = "class_type";
