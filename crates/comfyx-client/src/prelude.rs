//! Prelude module for convenient imports.
//!
//! ```rust
//! use comfyx_client::prelude::*;
//! ```

pub use crate::{
    ChannelState, ComfyClient, ComfyConfig, Error, ExecutionChannel, ImageRef, PromptId, Result,
    ServerMode,
};
