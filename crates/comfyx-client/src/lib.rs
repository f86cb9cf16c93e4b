#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod channel;
mod client;
mod config;
mod error;
mod history;

#[doc(hidden)]
pub mod prelude;

pub use crate::channel::{CLOSE_TIMEOUT, ChannelState, ExecutionChannel};
pub use crate::client::ComfyClient;
pub use crate::config::{
    ComfyConfig, DEFAULT_EVENT_CAPACITY, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS, DEFAULT_URL,
    ServerMode,
};
pub use crate::error::{Error, Result};
pub use crate::history::{History, ImageRef, NodeOutputs, PromptHistory, PromptId};

/// Tracing target for REST client operations.
pub const TRACING_TARGET_CLIENT: &str = "comfyx_client::client";

/// Tracing target for the execution channel.
pub const TRACING_TARGET_CHANNEL: &str = "comfyx_client::channel";
