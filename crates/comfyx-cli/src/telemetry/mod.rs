//! Telemetry and tracing configuration.

mod subscriber;

use anyhow::Context;

/// Initializes the tracing subscriber.
///
/// Logs go to stderr so command output on stdout stays machine readable.
pub(crate) fn init_tracing() -> anyhow::Result<()> {
    subscriber::init_tracing().context("failed to initialize tracing")
}
