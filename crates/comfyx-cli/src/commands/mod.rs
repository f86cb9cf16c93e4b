//! Command handlers.

mod generate;
mod input;
mod nodes;
mod queue;
mod workflow;

use crate::TRACING_TARGET_COMMAND;
use crate::config::{Cli, Command};

/// Runs the parsed command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::debug!(
        target: TRACING_TARGET_COMMAND,
        command = cli.command.name(),
        "running command"
    );

    match &cli.command {
        Command::Extract(args) => workflow::extract(args).await,
        Command::Validate(args) => workflow::validate(args).await,
        Command::Convert(args) => workflow::convert(args).await,
        Command::Graph(args) => workflow::graph(&cli.comfy, args).await,
        Command::Nodes(args) => nodes::list(&cli.comfy, args).await,
        Command::Queue(args) => queue::queue(&cli.comfy, args).await,
        Command::Watch(args) => queue::watch(&cli.comfy, args).await,
        Command::Generate(args) => generate::generate(&cli, args).await,
    }
}
