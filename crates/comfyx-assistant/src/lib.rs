#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod client;
mod config;
mod conversation;
mod error;
mod message;
mod payload;
mod prompt;
mod provider;

#[doc(hidden)]
pub mod prelude;

pub use crate::client::ChatClient;
pub use crate::config::{AssistantConfig, DEFAULT_MAX_TOKENS, DEFAULT_TIMEOUT_SECS};
pub use crate::conversation::Conversation;
pub use crate::error::{Error, Result};
pub use crate::message::{ChatMessage, ChatRole};
pub use crate::payload::{decode_reply, encode_request, summarize_error};
pub use crate::prompt::{DEFAULT_SYSTEM_PROMPT, PromptBuilder};
pub use crate::provider::ChatProvider;

/// Tracing target for provider requests.
pub const TRACING_TARGET_CLIENT: &str = "comfyx_assistant::client";

/// Tracing target for prompt assembly.
pub const TRACING_TARGET_PROMPT: &str = "comfyx_assistant::prompt";
