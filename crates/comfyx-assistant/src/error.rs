//! Error types for chat provider requests.

use std::path::PathBuf;

use comfyx_core::ErrorKind;

use crate::provider::ChatProvider;

/// Result type for assistant operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while talking to a chat provider.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No API key is configured for the provider.
    #[error("api key is not configured for {provider}")]
    MissingApiKey {
        /// Selected provider.
        provider: ChatProvider,
    },

    /// There is nothing to send.
    #[error("no messages to send")]
    EmptyConversation,

    /// The user message is blank.
    #[error("message cannot be empty")]
    EmptyMessage,

    /// HTTP request failed or timed out.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("{} api returned {status}: {message}", .provider.display_name())]
    Provider {
        /// Provider that failed.
        provider: ChatProvider,
        /// HTTP status code.
        status: u16,
        /// Summary of the error body.
        message: String,
    },

    /// The response body was not JSON.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// The response did not contain a text reply where expected.
    #[error("unexpected response format from {}", .provider.display_name())]
    UnexpectedResponse {
        /// Provider that answered.
        provider: ChatProvider,
    },

    /// A system prompt file could not be read.
    #[error("failed to read system prompt {}: {source}", .path.display())]
    PromptFile {
        /// Configured file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingApiKey { .. } | Self::PromptFile { .. } => ErrorKind::Configuration,
            Self::EmptyConversation | Self::EmptyMessage => ErrorKind::MalformedInput,
            Self::Http(err) if err.is_decode() => ErrorKind::ProtocolAnomaly,
            Self::Http(_) => ErrorKind::TransportFailure,
            Self::Provider { status, .. } => match *status {
                401 | 403 => ErrorKind::Configuration,
                429 | 500.. => ErrorKind::TransportFailure,
                _ => ErrorKind::MalformedInput,
            },
            Self::Json(_) | Self::UnexpectedResponse { .. } => ErrorKind::ProtocolAnomaly,
        }
    }

    /// Returns whether retrying the request may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Provider {
            provider: ChatProvider::OpenAi,
            status: 401,
            message: "invalid key".into(),
        };
        assert_eq!(err.to_string(), "OpenAI api returned 401: invalid key");
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = Error::MissingApiKey {
            provider: ChatProvider::Gemini,
        };
        assert_eq!(err.to_string(), "api key is not configured for gemini");
    }

    #[test]
    fn test_error_retryable() {
        let overloaded = Error::Provider {
            provider: ChatProvider::Claude,
            status: 529,
            message: "overloaded".into(),
        };
        assert!(overloaded.is_retryable());

        let limited = Error::Provider {
            provider: ChatProvider::Claude,
            status: 429,
            message: String::new(),
        };
        assert!(limited.is_retryable());

        assert!(!Error::EmptyConversation.is_retryable());
        assert_eq!(
            Error::UnexpectedResponse {
                provider: ChatProvider::Gemini
            }
            .kind(),
            ErrorKind::ProtocolAnomaly
        );
    }
}
