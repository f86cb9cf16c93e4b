//! Error types for job engine communication.

use comfyx_core::ErrorKind;
use tokio_tungstenite::tungstenite;

/// Result type for job engine operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while talking to the job engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The job engine answered with a non-success status.
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        /// Request path.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// WebSocket transport failed.
    #[error("websocket error: {0}")]
    WebSocket(#[source] Box<tungstenite::Error>),

    /// A response body was not the expected JSON.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// A configured URL does not parse.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// The configuration cannot be used.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong.
        reason: String,
    },

    /// `/prompt` accepted the request without returning a prompt id.
    #[error("job engine response did not include a prompt id")]
    MissingPromptId,

    /// A concurrent disconnect cancelled this connect.
    #[error("connect superseded by a concurrent disconnect")]
    Superseded,
}

impl From<tungstenite::Error> for Error {
    fn from(err: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

impl Error {
    /// Creates an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(err) if err.is_decode() => ErrorKind::ProtocolAnomaly,
            Self::Http(_) | Self::WebSocket(_) | Self::Superseded => ErrorKind::TransportFailure,
            Self::Status { status, .. } if *status >= 500 => ErrorKind::TransportFailure,
            Self::Status { .. } => ErrorKind::MalformedInput,
            Self::Json(_) | Self::MissingPromptId => ErrorKind::ProtocolAnomaly,
            Self::Url(_) | Self::InvalidConfig { .. } => ErrorKind::Configuration,
        }
    }

    /// Returns whether retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let status = Error::Status {
            endpoint: "/prompt".into(),
            status: 400,
            body: "bad node".into(),
        };
        assert_eq!(status.kind(), ErrorKind::MalformedInput);
        assert_eq!(status.to_string(), "/prompt returned 400: bad node");

        let unavailable = Error::Status {
            endpoint: "/history/x".into(),
            status: 503,
            body: String::new(),
        };
        assert!(unavailable.is_retryable());

        assert_eq!(Error::MissingPromptId.kind(), ErrorKind::ProtocolAnomaly);
        assert_eq!(Error::invalid_config("x").kind(), ErrorKind::Configuration);
        assert!(Error::from(tungstenite::Error::ConnectionClosed).is_retryable());
    }
}
