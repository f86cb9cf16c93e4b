//! Lifecycle states of the execution channel.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, IntoStaticStr};

/// Lifecycle state of an [`ExecutionChannel`](super::ExecutionChannel).
///
/// `Disconnected → Connecting → Connected → Closing → Disconnected`, with
/// `Connected → Disconnected` directly when the remote closes or the
/// transport fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChannelState {
    /// No session.
    #[default]
    Disconnected,
    /// Opening the transport.
    Connecting,
    /// Receiving events.
    Connected,
    /// Performing the close handshake.
    Closing,
}

impl ChannelState {
    /// Returns whether a session is receiving events.
    #[inline]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}
