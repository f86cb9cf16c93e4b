//! Supported chat providers.

#[cfg(feature = "config")]
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// A hosted chat completion service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumIter, EnumString)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[strum(ascii_case_insensitive)]
pub enum ChatProvider {
    /// OpenAI chat completions.
    #[default]
    #[serde(rename = "openai")]
    #[strum(to_string = "openai")]
    #[cfg_attr(feature = "config", value(name = "openai"))]
    OpenAi,

    /// Anthropic messages.
    #[serde(rename = "claude", alias = "anthropic")]
    #[strum(to_string = "claude", serialize = "anthropic")]
    #[cfg_attr(feature = "config", value(name = "claude", alias = "anthropic"))]
    Claude,

    /// Google Gemini `generateContent`.
    #[serde(rename = "gemini", alias = "google")]
    #[strum(to_string = "gemini", serialize = "google")]
    #[cfg_attr(feature = "config", value(name = "gemini", alias = "google"))]
    Gemini,
}

impl ChatProvider {
    /// Returns the model used when none is configured.
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::Claude => "claude-sonnet-4-20250514",
            Self::Gemini => "gemini-2.0-flash",
        }
    }

    /// Returns the public API base URL.
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Claude => "https://api.anthropic.com/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    /// Returns the request path below the base URL for `model`.
    pub fn request_path(self, model: &str) -> String {
        match self {
            Self::OpenAi => "chat/completions".to_owned(),
            Self::Claude => "messages".to_owned(),
            Self::Gemini => format!("models/{model}:generateContent"),
        }
    }

    /// Returns the provider name used in messages.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Claude => "Claude",
            Self::Gemini => "Gemini",
        }
    }
}
