//! REST facade over the job engine.

use std::sync::Arc;

use bytes::Bytes;
use comfyx_workflow::NodeRegistry;
use reqwest::{Client, Response};
use serde_json::{Value, json};
use url::Url;

use crate::channel::ExecutionChannel;
use crate::config::ComfyConfig;
use crate::history::{History, ImageRef, PromptId};
use crate::{Error, Result, TRACING_TARGET_CLIENT};

/// Longest response body kept in a status error.
const MAX_ERROR_BODY: usize = 200;

fn user_agent() -> String {
    format!("comfyx/{}", env!("CARGO_PKG_VERSION"))
}

/// Inner client that holds the HTTP client and configuration.
struct ComfyClientInner {
    http: Client,
    base_url: Url,
    config: ComfyConfig,
}

/// HTTP client for the job engine's REST endpoints.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct ComfyClient {
    inner: Arc<ComfyClientInner>,
}

impl std::fmt::Debug for ComfyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComfyClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ComfyClient {
    /// Creates a client for the configured job engine.
    pub fn new(config: ComfyConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        let timeout = config.timeout();

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            base_url = %base_url,
            timeout_ms = timeout.as_millis() as u64,
            mode = %config.comfy_mode,
            "creating job engine client"
        );

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()?;

        let inner = ComfyClientInner {
            http,
            base_url,
            config,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Returns the HTTP base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ComfyConfig {
        &self.inner.config
    }

    /// Returns the WebSocket endpoint for an [`ExecutionChannel`].
    pub fn websocket_url(&self) -> Result<Url> {
        self.inner.config.websocket_url()
    }

    /// Creates a disconnected execution channel sized from the configuration.
    pub fn channel(&self) -> ExecutionChannel {
        ExecutionChannel::new(self.inner.config.event_capacity())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Returns whether `/system_stats` answers with a success status.
    pub async fn check_connection(&self) -> bool {
        let result = self.inner.http.get(self.endpoint("system_stats")).send().await;
        match result {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::debug!(
                    target: TRACING_TARGET_CLIENT,
                    error = %err,
                    "job engine unreachable"
                );
                false
            }
        }
    }

    /// Fetches the node definitions from `/object_info`.
    pub async fn object_info(&self) -> Result<NodeRegistry> {
        let response = self.inner.http.get(self.endpoint("object_info")).send().await?;
        let object_info: Value = ensure_success(response, "/object_info").await?.json().await?;
        let registry = NodeRegistry::from_object_info(&object_info);

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            definition_count = registry.len(),
            "fetched node definitions"
        );
        Ok(registry)
    }

    /// Queues an execution-form workflow and returns its prompt id.
    pub async fn queue_prompt(&self, workflow: &Value) -> Result<PromptId> {
        self.submit(json!({ "prompt": workflow })).await
    }

    /// Queues a workflow so that its events are routed to `channel`.
    pub async fn queue_prompt_for(
        &self,
        workflow: &Value,
        channel: &ExecutionChannel,
    ) -> Result<PromptId> {
        self.submit(json!({ "prompt": workflow, "client_id": channel.client_id() }))
            .await
    }

    async fn submit(&self, body: Value) -> Result<PromptId> {
        let response = self
            .inner
            .http
            .post(self.endpoint("prompt"))
            .json(&body)
            .send()
            .await?;
        let reply: Value = ensure_success(response, "/prompt").await?.json().await?;

        let prompt_id = reply
            .get("prompt_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(PromptId::new)
            .ok_or(Error::MissingPromptId)?;

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            prompt_id = %prompt_id,
            "queued prompt"
        );
        Ok(prompt_id)
    }

    /// Downloads an image via `/view`.
    pub async fn view_image(&self, image: &ImageRef) -> Result<Bytes> {
        let response = self
            .inner
            .http
            .get(self.endpoint("view"))
            .query(&image.query())
            .send()
            .await?;
        let bytes = ensure_success(response, "/view").await?.bytes().await?;

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            filename = %image.filename,
            size = bytes.len(),
            "downloaded image"
        );
        Ok(bytes)
    }

    /// Fetches `/history/{prompt_id}`.
    ///
    /// The history is empty until the prompt has finished.
    pub async fn history(&self, prompt_id: &PromptId) -> Result<History> {
        let path = format!("history/{prompt_id}");
        let response = self.inner.http.get(self.endpoint(&path)).send().await?;
        let history = ensure_success(response, &path).await?.json().await?;
        Ok(history)
    }
}

/// Turns a non-success response into [`Error::Status`].
async fn ensure_success(response: Response, endpoint: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body = match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body,
    };

    tracing::warn!(
        target: TRACING_TARGET_CLIENT,
        endpoint,
        status = status.as_u16(),
        "job engine returned an error status"
    );

    Err(Error::Status {
        endpoint: endpoint.to_owned(),
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ComfyClient::new(ComfyConfig::default()).unwrap();
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:8188/");
        assert_eq!(client.endpoint("prompt"), "http://127.0.0.1:8188/prompt");
        assert_eq!(client.websocket_url().unwrap().as_str(), "ws://127.0.0.1:8188/ws");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = ComfyClient::new(ComfyConfig::external("https://host/comfy/")).unwrap();
        assert_eq!(client.endpoint("history/p1"), "https://host/comfy/history/p1");
    }

    #[test]
    fn test_channel_capacity_from_config() {
        let client = ComfyClient::new(ComfyConfig::default().with_event_capacity(4)).unwrap();
        let channel = client.channel();
        assert_eq!(channel.client_id().len(), 32);
    }

    #[test]
    fn test_user_agent() {
        assert!(user_agent().starts_with("comfyx/"));
    }

    #[test]
    fn test_invalid_config() {
        let err = ComfyClient::new(ComfyConfig::external("ftp://host")).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }
}
