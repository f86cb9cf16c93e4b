//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── comfy: ComfyConfig          # Job engine URL, mode, timeouts
//! ├── assistant: AssistantConfig  # Chat provider, key, model
//! └── command: Command            # What to do
//! ```
//!
//! Connection settings can be provided via CLI arguments or environment
//! variables. Use `--help` to see all available options.
//!
//! ```bash
//! comfyx --comfy-url http://gpu-box:8188 queue workflow.json
//! COMFY_URL=http://gpu-box:8188 AI_PROVIDER=claude comfyx generate "a red fox"
//! ```

mod command;

use std::process;

use clap::Parser;
use comfyx_assistant::AssistantConfig;
use comfyx_client::ComfyConfig;

pub use self::command::{
    Command, GenerateArgs, GraphArgs, InputArgs, NodesArgs, QueueArgs, WatchArgs,
};
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "comfyx")]
#[command(about = "ComfyUI workflow tooling and AI-assisted generation")]
#[command(version)]
pub struct Cli {
    /// Job engine connection.
    #[clap(flatten)]
    pub comfy: ComfyConfig,

    /// Chat provider used by `generate`.
    #[clap(flatten)]
    pub assistant: AssistantConfig,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded first so that clap's `env` lookups see its values.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Logs configuration at debug level (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "build information"
        );

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            command = self.command.name(),
            comfy_mode = %self.comfy.comfy_mode,
            comfy_url = %self.comfy.comfy_url,
            comfy_port = self.comfy.comfy_port,
            comfy_timeout_secs = self.comfy.comfy_timeout_secs,
            ai_provider = %self.assistant.ai_provider,
            ai_model = self.assistant.model(),
            ai_api_key_set = self.assistant.api_key().is_some(),
            "configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::CommandFactory;
    use comfyx_assistant::ChatProvider;
    use comfyx_client::ServerMode;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_queue() {
        let cli = Cli::try_parse_from([
            "comfyx",
            "--comfy-mode",
            "embedded",
            "--comfy-port",
            "9000",
            "queue",
            "flow.json",
            "--download",
            "out",
        ])
        .unwrap();

        assert_eq!(cli.comfy.comfy_mode, ServerMode::Embedded);
        assert_eq!(cli.comfy.comfy_port, 9000);
        let Command::Queue(args) = cli.command else {
            panic!("expected queue command");
        };
        assert_eq!(args.input.path, PathBuf::from("flow.json"));
        assert_eq!(args.download, Some(PathBuf::from("out")));
        assert!(!args.no_wait);
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "comfyx",
            "--ai-provider",
            "anthropic",
            "generate",
            "a red fox",
            "--queue",
        ])
        .unwrap();

        assert_eq!(cli.assistant.ai_provider, ChatProvider::Claude);
        let Command::Generate(args) = cli.command else {
            panic!("expected generate command");
        };
        assert_eq!(args.request, "a red fox");
        assert!(args.queue);
    }
}
