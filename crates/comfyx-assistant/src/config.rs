//! Chat provider configuration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::provider::ChatProvider;

/// Default request timeout: 120 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default reply length limit for providers that require one.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Configuration for a [`ChatClient`](crate::ChatClient).
#[derive(Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct AssistantConfig {
    /// Chat provider
    #[cfg_attr(
        feature = "config",
        arg(long = "ai-provider", env = "AI_PROVIDER", value_enum, default_value_t = ChatProvider::OpenAi)
    )]
    pub ai_provider: ChatProvider,

    /// API key for the selected provider
    #[cfg_attr(
        feature = "config",
        arg(long = "ai-api-key", env = "AI_API_KEY", hide_env_values = true)
    )]
    #[serde(skip_serializing)]
    pub ai_api_key: Option<String>,

    /// Model name, defaults to the provider's recommended model
    #[cfg_attr(feature = "config", arg(long = "ai-model", env = "AI_MODEL"))]
    pub ai_model: Option<String>,

    /// Override for the provider's API base URL
    #[cfg_attr(feature = "config", arg(long = "ai-base-url", env = "AI_BASE_URL"))]
    pub ai_base_url: Option<String>,

    /// Request timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "ai-timeout-secs", env = "AI_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)
    )]
    pub ai_timeout_secs: u64,

    /// Maximum reply tokens for providers that require a limit
    #[cfg_attr(
        feature = "config",
        arg(long = "ai-max-tokens", env = "AI_MAX_TOKENS", default_value_t = DEFAULT_MAX_TOKENS)
    )]
    pub ai_max_tokens: u32,

    /// File replacing the built-in system prompt
    #[cfg_attr(feature = "config", arg(long = "ai-system-prompt", env = "AI_SYSTEM_PROMPT"))]
    pub ai_system_prompt: Option<PathBuf>,
}

impl fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("ai_provider", &self.ai_provider)
            .field("ai_api_key", &self.ai_api_key.as_ref().map(|_| "***"))
            .field("ai_model", &self.ai_model)
            .field("ai_base_url", &self.ai_base_url)
            .field("ai_timeout_secs", &self.ai_timeout_secs)
            .field("ai_max_tokens", &self.ai_max_tokens)
            .field("ai_system_prompt", &self.ai_system_prompt)
            .finish()
    }
}

impl AssistantConfig {
    /// Creates a configuration for `provider` authenticated with `api_key`.
    pub fn new(provider: ChatProvider, api_key: impl Into<String>) -> Self {
        Self {
            ai_provider: provider,
            ai_api_key: Some(api_key.into()),
            ai_timeout_secs: DEFAULT_TIMEOUT_SECS,
            ai_max_tokens: DEFAULT_MAX_TOKENS,
            ..Self::default()
        }
    }

    /// Sets the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.ai_model = Some(model.into());
        self
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.ai_base_url = Some(base_url.into());
        self
    }

    /// Sets the request timeout in seconds.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.ai_timeout_secs = secs;
        self
    }

    /// Sets the system prompt file.
    #[must_use]
    pub fn with_system_prompt(mut self, path: impl Into<PathBuf>) -> Self {
        self.ai_system_prompt = Some(path.into());
        self
    }

    /// Returns the configured API key when it is not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.ai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Returns the configured model or the provider default.
    pub fn model(&self) -> &str {
        self.ai_model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| self.ai_provider.default_model())
    }

    /// Returns the API base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.ai_base_url
            .as_deref()
            .unwrap_or_else(|| self.ai_provider.default_base_url())
            .trim_end_matches('/')
    }

    /// Returns the request timeout, using the default when zero.
    #[inline]
    pub fn timeout(&self) -> Duration {
        match self.ai_timeout_secs {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Returns the reply token limit, using the default when zero.
    #[inline]
    pub fn max_tokens(&self) -> u32 {
        match self.ai_max_tokens {
            0 => DEFAULT_MAX_TOKENS,
            tokens => tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AssistantConfig::new(ChatProvider::Claude, "key");
        assert_eq!(config.model(), "claude-sonnet-4-20250514");
        assert_eq!(config.base_url(), "https://api.anthropic.com/v1");
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert_eq!(config.max_tokens(), 4096);
        assert_eq!(config.api_key(), Some("key"));
    }

    #[test]
    fn test_blank_values_fall_back() {
        let mut config = AssistantConfig::default().with_model("  ");
        config.ai_api_key = Some(" ".into());
        assert_eq!(config.model(), "gpt-4o");
        assert_eq!(config.api_key(), None);
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.max_tokens(), DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_base_url_override() {
        let config =
            AssistantConfig::new(ChatProvider::OpenAi, "k").with_base_url("http://127.0.0.1:9/v1/");
        assert_eq!(config.base_url(), "http://127.0.0.1:9/v1");
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = AssistantConfig::new(ChatProvider::OpenAi, "sk-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("***"));
    }
}
