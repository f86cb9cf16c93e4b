//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use comfyx_assistant::prelude::*;
//! ```

pub use crate::client::ChatClient;
pub use crate::config::AssistantConfig;
pub use crate::conversation::Conversation;
pub use crate::error::{Error, Result};
pub use crate::message::{ChatMessage, ChatRole};
pub use crate::prompt::PromptBuilder;
pub use crate::provider::ChatProvider;
