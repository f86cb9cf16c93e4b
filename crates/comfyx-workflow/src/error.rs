//! Error types for workflow document processing.

use comfyx_core::ErrorKind;

use crate::layout::LayoutOptionsBuilderError;

/// Result type for workflow operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while reading or converting workflow documents.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The document is not valid JSON.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// The document root is not a JSON object.
    #[error("workflow document must be a json object")]
    NotAnObject,

    /// A required field is absent.
    #[error("missing field `{field}` in {context}")]
    MissingField {
        /// Name of the absent field.
        field: &'static str,
        /// Where the field was expected.
        context: String,
    },

    /// A field has an unexpected shape.
    #[error("invalid field `{field}` in {context}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Where the field was found.
        context: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two nodes share the same identifier.
    #[error("duplicate node id `{node_id}`")]
    DuplicateNode {
        /// The repeated identifier.
        node_id: String,
    },

    /// Layout options failed validation.
    #[error("invalid layout options: {0}")]
    LayoutOptions(#[from] LayoutOptionsBuilderError),
}

impl Error {
    /// Creates a missing field error.
    pub fn missing_field(field: &'static str, context: impl Into<String>) -> Self {
        Self::MissingField {
            field,
            context: context.into(),
        }
    }

    /// Creates an invalid field error.
    pub fn invalid_field(
        field: &'static str,
        context: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            field,
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LayoutOptions(_) => ErrorKind::Configuration,
            Self::Json(_)
            | Self::NotAnObject
            | Self::MissingField { .. }
            | Self::InvalidField { .. }
            | Self::DuplicateNode { .. } => ErrorKind::MalformedInput,
        }
    }

    /// Returns whether retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
