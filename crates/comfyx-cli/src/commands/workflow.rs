//! Offline workflow commands.

use anyhow::{Context, bail};
use comfyx_client::{ComfyClient, ComfyConfig};
use comfyx_workflow::{GraphBuilder, LayoutOptions};

use super::input::read_input;
use crate::TRACING_TARGET_COMMAND;
use crate::config::{GraphArgs, InputArgs};

/// `extract`: prints the first workflow object found in the text.
pub async fn extract(args: &InputArgs) -> anyhow::Result<()> {
    let text = read_input(args).await?;
    let Some(workflow) = comfyx_workflow::extract_workflow_json(&text) else {
        bail!("no workflow json found in {}", args.path.display());
    };

    println!("{}", comfyx_workflow::format_workflow(workflow));
    Ok(())
}

/// `validate`: fails unless the document is a workflow in either form.
pub async fn validate(args: &InputArgs) -> anyhow::Result<()> {
    let text = read_input(args).await?;
    if !comfyx_workflow::validate_workflow(&text) {
        bail!("{} is not a workflow", args.path.display());
    }

    println!("valid");
    Ok(())
}

/// `convert`: prints the execution form of the document.
pub async fn convert(args: &InputArgs) -> anyhow::Result<()> {
    let text = read_input(args).await?;
    let converted = comfyx_workflow::convert_workflow(&text)
        .with_context(|| format!("{} cannot be converted", args.path.display()))?;

    println!("{converted}");
    Ok(())
}

/// `graph`: prints the laid out display graph.
pub async fn graph(config: &ComfyConfig, args: &GraphArgs) -> anyhow::Result<()> {
    let text = read_input(&args.input).await?;

    let registry = if args.with_registry {
        let client = ComfyClient::new(config.clone()).context("invalid job engine configuration")?;
        Some(
            client
                .object_info()
                .await
                .context("failed to fetch node definitions")?,
        )
    } else {
        None
    };

    let builder = match &registry {
        Some(registry) => GraphBuilder::with_registry(registry),
        None => GraphBuilder::new(),
    };
    let graph = comfyx_workflow::load_display_graph_with(&text, builder, &LayoutOptions::default());
    if graph.is_empty() {
        bail!("{} contains no loadable nodes", args.input.path.display());
    }

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        node_count = graph.node_count(),
        connection_count = graph.connection_count(),
        cyclic = graph.is_cyclic(),
        "built display graph"
    );

    let output = if args.compact {
        serde_json::to_string(&graph)?
    } else {
        serde_json::to_string_pretty(&graph)?
    };
    println!("{output}");
    Ok(())
}
