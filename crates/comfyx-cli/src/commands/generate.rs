//! AI-assisted workflow generation.

use anyhow::{Context, bail};
use comfyx_assistant::{ChatClient, Conversation, PromptBuilder};
use comfyx_client::ComfyClient;
use comfyx_workflow::NodeRegistry;

use super::input::execution_workflow;
use super::queue::submit;
use crate::TRACING_TARGET_COMMAND;
use crate::config::{Cli, GenerateArgs};

/// `generate`: asks the chat provider for a workflow and prints it.
pub async fn generate(cli: &Cli, args: &GenerateArgs) -> anyhow::Result<()> {
    let prompts = match &cli.assistant.ai_system_prompt {
        Some(path) => PromptBuilder::from_file(path)?,
        None => PromptBuilder::new(),
    };

    let registry = if args.with_nodes {
        fetch_registry(cli).await
    } else {
        None
    };

    let chat = ChatClient::new(cli.assistant.clone()).context("invalid chat provider configuration")?;
    let mut conversation = Conversation::new(prompts.system_prompt(registry.as_ref()));
    let reply = conversation
        .ask(&chat, &PromptBuilder::workflow_request(&args.request))
        .await
        .context("chat request failed")?;

    let Some(workflow) = comfyx_workflow::extract_workflow_json(&reply) else {
        bail!("the reply did not contain a workflow:\n{reply}");
    };
    if !comfyx_workflow::validate_workflow(workflow) {
        bail!("the reply contained json that is not a workflow:\n{workflow}");
    }

    let formatted = comfyx_workflow::format_workflow(workflow);
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, &formatted)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(
                target: TRACING_TARGET_COMMAND,
                path = %path.display(),
                "saved generated workflow"
            );
        }
        None => println!("{formatted}"),
    }

    if args.queue {
        let client =
            ComfyClient::new(cli.comfy.clone()).context("invalid job engine configuration")?;
        submit(&client, &execution_workflow(workflow)?, true, args.download.as_deref()).await?;
    }
    Ok(())
}

/// Fetches node definitions, continuing without them when unavailable.
async fn fetch_registry(cli: &Cli) -> Option<NodeRegistry> {
    let result = match ComfyClient::new(cli.comfy.clone()) {
        Ok(client) => client.object_info().await,
        Err(err) => Err(err),
    };

    match result {
        Ok(registry) => Some(registry),
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET_COMMAND,
                error = %err,
                "continuing without the node catalogue"
            );
            None
        }
    }
}
