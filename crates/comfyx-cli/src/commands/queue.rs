//! Submitting workflows and following execution.

use std::path::{Path, PathBuf};
use std::pin::pin;
use std::time::Duration;

use anyhow::{Context, bail};
use comfyx_client::{ChannelState, ComfyClient, ComfyConfig, ExecutionChannel, History, PromptId};
use comfyx_core::ExecutionEvent;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;

use super::input::{execution_workflow, read_input};
use crate::TRACING_TARGET_COMMAND;
use crate::config::{QueueArgs, WatchArgs};

/// Interval between `/history` checks once an output node has reported.
const HISTORY_POLL: Duration = Duration::from_millis(500);

/// `queue`: submits a workflow file.
pub async fn queue(config: &ComfyConfig, args: &QueueArgs) -> anyhow::Result<()> {
    let text = read_input(&args.input).await?;
    let workflow = execution_workflow(&text)?;
    let client = ComfyClient::new(config.clone()).context("invalid job engine configuration")?;

    submit(&client, &workflow, !args.no_wait, args.download.as_deref()).await
}

/// Submits an execution-form workflow, optionally waiting for its outputs.
pub async fn submit(
    client: &ComfyClient,
    workflow: &Value,
    wait: bool,
    download: Option<&Path>,
) -> anyhow::Result<()> {
    if !client.check_connection().await {
        bail!("job engine at {} is not reachable", client.base_url());
    }

    if !wait {
        let prompt_id = client.queue_prompt(workflow).await.context("failed to queue prompt")?;
        println!("{prompt_id}");
        return Ok(());
    }

    let channel = client.channel();
    let endpoint = client.websocket_url()?;
    channel
        .connect(&endpoint)
        .await
        .context("failed to open the execution channel")?;

    let outcome = run_to_completion(client, &channel, workflow).await;
    channel.disconnect().await;
    let (prompt_id, history) = outcome?;

    let images = history.images(&prompt_id);
    if images.is_empty() {
        tracing::info!(
            target: TRACING_TARGET_COMMAND,
            prompt_id = %prompt_id,
            "prompt finished without images"
        );
    }

    for image in images {
        match download {
            Some(dir) => {
                let path = save_image(client, image, dir).await?;
                println!("{}", path.display());
            }
            None => println!("{}", image.filename),
        }
    }
    Ok(())
}

/// What the wait loop does after an execution event.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// Keep listening.
    Wait,
    /// An output node finished; the prompt may be done.
    CheckHistory,
    /// The prompt failed on the engine.
    Fail(String),
}

/// Follows the execution events of one submitted prompt.
///
/// The engine reports one `Completed` per output node, so completion is only
/// ever a hint to look at `/history`.
#[derive(Debug)]
struct PromptTracker {
    prompt_id: PromptId,
    finished_outputs: usize,
}

impl PromptTracker {
    fn new(prompt_id: PromptId) -> Self {
        Self {
            prompt_id,
            finished_outputs: 0,
        }
    }

    /// Returns whether history polling has been armed.
    fn outputs_seen(&self) -> bool {
        self.finished_outputs > 0
    }

    fn observe(&mut self, event: &ExecutionEvent) -> Step {
        if !event.concerns(self.prompt_id.as_str()) {
            return Step::Wait;
        }

        match event {
            ExecutionEvent::Progress(progress) => {
                tracing::info!(
                    target: TRACING_TARGET_COMMAND,
                    node_id = %progress.node_id,
                    value = progress.value,
                    max = progress.max,
                    percent = progress.percent().round(),
                    "progress"
                );
                Step::Wait
            }
            ExecutionEvent::Completed { node_id, .. } => {
                self.finished_outputs += 1;
                tracing::info!(
                    target: TRACING_TARGET_COMMAND,
                    prompt_id = %self.prompt_id,
                    node_id = node_id.as_deref().unwrap_or_default(),
                    finished_outputs = self.finished_outputs,
                    "output node executed"
                );
                Step::CheckHistory
            }
            ExecutionEvent::Failed { message, .. } => Step::Fail(message.clone()),
        }
    }

    /// Returns the history once it records the prompt.
    fn finished(&self, history: History) -> Option<History> {
        history.contains(&self.prompt_id).then_some(history)
    }
}

/// Queues the workflow on `channel` and waits until its history is recorded.
///
/// After the first output node reports, `/history` is checked on every
/// further output and every [`HISTORY_POLL`] for as long as the channel stays
/// connected.
async fn run_to_completion(
    client: &ComfyClient,
    channel: &ExecutionChannel,
    workflow: &Value,
) -> anyhow::Result<(PromptId, History)> {
    let mut events = channel.subscribe();
    let mut states = channel.watch_state();

    let prompt_id = client
        .queue_prompt_for(workflow, channel)
        .await
        .context("failed to queue prompt")?;
    println!("{prompt_id}");

    let mut tracker = PromptTracker::new(prompt_id.clone());
    let mut poll = tokio::time::interval(HISTORY_POLL);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            received = events.recv() => match received {
                Ok(event) => match tracker.observe(&event) {
                    Step::Wait => {}
                    Step::CheckHistory => poll.reset_immediately(),
                    Step::Fail(message) => bail!("prompt {prompt_id} failed: {message}"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        target: TRACING_TARGET_COMMAND,
                        skipped,
                        "fell behind the execution channel"
                    );
                }
                Err(RecvError::Closed) => bail!("execution channel closed"),
            },
            _ = poll.tick(), if tracker.outputs_seen() => {
                let history = client
                    .history(&prompt_id)
                    .await
                    .context("failed to fetch prompt history")?;
                if let Some(history) = tracker.finished(history) {
                    return Ok((prompt_id, history));
                }
                tracing::debug!(
                    target: TRACING_TARGET_COMMAND,
                    prompt_id = %prompt_id,
                    "prompt still running"
                );
            }
            _ = states.wait_for(|state| *state == ChannelState::Disconnected) => {
                bail!("execution channel disconnected before prompt {prompt_id} finished");
            }
            _ = tokio::signal::ctrl_c() => bail!("interrupted"),
        }
    }
}

/// Downloads an image into `dir`, keeping only the file name part.
async fn save_image(
    client: &ComfyClient,
    image: &comfyx_client::ImageRef,
    dir: &Path,
) -> anyhow::Result<PathBuf> {
    let name = Path::new(&image.filename)
        .file_name()
        .with_context(|| format!("invalid image file name `{}`", image.filename))?;
    let bytes = client
        .view_image(image)
        .await
        .with_context(|| format!("failed to download {}", image.filename))?;

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(name);
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(path)
}

/// `watch`: prints execution events as JSON lines until interrupted.
pub async fn watch(config: &ComfyConfig, args: &WatchArgs) -> anyhow::Result<()> {
    let client = ComfyClient::new(config.clone()).context("invalid job engine configuration")?;
    let channel = client.channel();
    let mut events = pin!(channel.events());
    let mut states = channel.watch_state();

    channel
        .connect(&client.websocket_url()?)
        .await
        .context("failed to open the execution channel")?;
    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        client_id = channel.client_id(),
        "watching execution events"
    );

    let result = loop {
        tokio::select! {
            biased;
            event = events.next() => {
                let Some(event) = event else {
                    break Ok(());
                };
                if args
                    .prompt_id
                    .as_deref()
                    .is_none_or(|prompt_id| event.concerns(prompt_id))
                {
                    println!("{}", serde_json::to_string(&event)?);
                }
            }
            _ = states.wait_for(|state| *state == ChannelState::Disconnected) => {
                break Err(anyhow::anyhow!("execution channel disconnected"));
            }
            _ = tokio::signal::ctrl_c() => break Ok(()),
        }
    };

    channel.disconnect().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(prompt_id: &str, node_id: &str) -> ExecutionEvent {
        ExecutionEvent::Completed {
            job_id: Some(prompt_id.into()),
            node_id: Some(node_id.into()),
        }
    }

    fn history(json: serde_json::Value) -> History {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_each_output_node_only_checks_history() {
        let mut tracker = PromptTracker::new(PromptId::new("p1"));
        assert!(!tracker.outputs_seen());

        let progress = ExecutionEvent::Progress(comfyx_core::Progress {
            job_id: Some("p1".into()),
            node_id: "12".into(),
            value: 1,
            max: 20,
        });
        let steps: Vec<Step> = [completed("p1", "9"), progress, completed("p1", "14")]
            .iter()
            .map(|event| tracker.observe(event))
            .collect();

        assert_eq!(steps, [Step::CheckHistory, Step::Wait, Step::CheckHistory]);
        assert!(tracker.outputs_seen());
        assert_eq!(tracker.finished_outputs, 2);
    }

    #[test]
    fn test_other_prompts_are_ignored() {
        let mut tracker = PromptTracker::new(PromptId::new("p1"));
        assert_eq!(tracker.observe(&completed("p2", "9")), Step::Wait);
        assert!(!tracker.outputs_seen());

        let failed = ExecutionEvent::Failed {
            job_id: Some("p1".into()),
            message: "out of memory".into(),
        };
        assert_eq!(tracker.observe(&failed), Step::Fail("out of memory".into()));
    }

    #[test]
    fn test_finished_requires_prompt_in_history() {
        let tracker = PromptTracker::new(PromptId::new("p1"));
        assert!(tracker.finished(history(serde_json::json!({}))).is_none());

        let recorded = history(serde_json::json!({
            "p1": {"outputs": {"9": {"images": [
                {"filename": "a.png", "subfolder": "", "type": "output"}
            ]}}}
        }));
        let finished = tracker.finished(recorded).unwrap();
        assert_eq!(finished.images(&PromptId::new("p1")).len(), 1);
    }
}
