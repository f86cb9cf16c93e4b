//! HTTP client for chat providers.

use std::fmt;
use std::sync::Arc;

use reqwest::Client;
use serde_json::Value;

use crate::config::AssistantConfig;
use crate::message::ChatMessage;
use crate::payload::{decode_reply, encode_request, summarize_error};
use crate::provider::ChatProvider;
use crate::{Error, Result, TRACING_TARGET_CLIENT};

/// Version header required by the Anthropic API.
const ANTHROPIC_VERSION: &str = "2023-06-01";

struct ChatClientInner {
    http: Client,
    config: AssistantConfig,
}

/// Sends conversations to the configured chat provider.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<ChatClientInner>,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("provider", &self.inner.config.ai_provider)
            .field("model", &self.inner.config.model())
            .finish_non_exhaustive()
    }
}

impl ChatClient {
    /// Creates a client from configuration.
    pub fn new(config: AssistantConfig) -> Result<Self> {
        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            provider = %config.ai_provider,
            model = config.model(),
            base_url = config.base_url(),
            timeout_secs = config.timeout().as_secs(),
            "creating chat client"
        );

        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("comfyx/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ChatClientInner { http, config }),
        })
    }

    /// Returns the selected provider.
    pub fn provider(&self) -> ChatProvider {
        self.inner.config.ai_provider
    }

    /// Returns the model requests are sent to.
    pub fn model(&self) -> &str {
        self.inner.config.model()
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &AssistantConfig {
        &self.inner.config
    }

    /// Sends `messages` and returns the provider's first text reply.
    pub async fn send(&self, messages: &[ChatMessage]) -> Result<String> {
        let config = &self.inner.config;
        let provider = config.ai_provider;
        let api_key = config.api_key().ok_or(Error::MissingApiKey { provider })?;
        if messages.is_empty() {
            return Err(Error::EmptyConversation);
        }

        let model = config.model();
        let url = format!("{}/{}", config.base_url(), provider.request_path(model));
        let body = encode_request(provider, model, messages, config.max_tokens());

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            provider = %provider,
            model,
            message_count = messages.len(),
            "sending chat request"
        );

        let request = self.inner.http.post(&url).json(&body);
        let request = match provider {
            ChatProvider::OpenAi => request.bearer_auth(api_key),
            ChatProvider::Claude => request
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            ChatProvider::Gemini => request.query(&[("key", api_key)]),
        };

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                target: TRACING_TARGET_CLIENT,
                provider = %provider,
                status = status.as_u16(),
                "chat provider returned an error status"
            );
            return Err(Error::Provider {
                provider,
                status: status.as_u16(),
                message: summarize_error(&text),
            });
        }

        let response: Value = serde_json::from_str(&text)?;
        let reply = decode_reply(provider, &response).ok_or_else(|| {
            tracing::warn!(
                target: TRACING_TARGET_CLIENT,
                provider = %provider,
                "chat response has no text reply"
            );
            Error::UnexpectedResponse { provider }
        })?;

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            provider = %provider,
            reply_chars = reply.chars().count(),
            "chat reply received"
        );
        Ok(reply)
    }
}
