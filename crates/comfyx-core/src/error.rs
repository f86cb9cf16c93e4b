//! Error classification shared by every comfyx crate.

use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Categories of failures that can occur anywhere in comfyx.
///
/// Individual crates keep their own error enums; each one maps its variants
/// onto one of these kinds so callers can decide how to react without
/// matching on crate-specific types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Unparsable JSON or a document missing required fields.
    MalformedInput,
    /// Connection refused, handshake failure or a dropped stream.
    TransportFailure,
    /// The remote side sent something structurally unexpected.
    ProtocolAnomaly,
    /// A work budget was exhausted before the operation completed.
    ResourceExhaustion,
    /// User supplied configuration is invalid.
    Configuration,
}

impl ErrorKind {
    /// Check if this error kind is typically retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportFailure)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::MalformedInput.to_string(), "malformed_input");
        assert_eq!(ErrorKind::TransportFailure.as_ref(), "transport_failure");
    }

    #[test]
    fn test_error_kind_from_str() {
        let kind = ErrorKind::from_str("protocol_anomaly").unwrap();
        assert_eq!(kind, ErrorKind::ProtocolAnomaly);
        assert!(ErrorKind::from_str("nope").is_err());
    }

    #[test]
    fn test_error_kind_retryable() {
        assert!(ErrorKind::TransportFailure.is_retryable());
        assert!(!ErrorKind::MalformedInput.is_retryable());
        assert!(!ErrorKind::ResourceExhaustion.is_retryable());
    }
}
