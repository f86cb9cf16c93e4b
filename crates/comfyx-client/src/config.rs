//! Job engine connection configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use url::Url;

use crate::{Error, Result};

/// Default job engine address in external mode.
pub const DEFAULT_URL: &str = "http://127.0.0.1:8188";

/// Default job engine port in embedded mode.
pub const DEFAULT_PORT: u16 = 8188;

/// Default timeout for REST requests: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of buffered events per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// How the job engine is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ServerMode {
    /// A server reachable at a configured URL.
    #[default]
    External,
    /// A server on the local machine at a configured port.
    Embedded,
}

/// Configuration for reaching the job engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ComfyConfig {
    /// How the job engine is reached
    #[cfg_attr(
        feature = "config",
        arg(long = "comfy-mode", env = "COMFY_MODE", value_enum, default_value_t = ServerMode::External)
    )]
    pub comfy_mode: ServerMode,

    /// Job engine URL used in external mode
    #[cfg_attr(
        feature = "config",
        arg(long = "comfy-url", env = "COMFY_URL", default_value = DEFAULT_URL)
    )]
    pub comfy_url: String,

    /// Local port used in embedded mode
    #[cfg_attr(
        feature = "config",
        arg(long = "comfy-port", env = "COMFY_PORT", default_value_t = DEFAULT_PORT)
    )]
    pub comfy_port: u16,

    /// REST request timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "comfy-timeout-secs", env = "COMFY_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)
    )]
    pub comfy_timeout_secs: u64,

    /// Events buffered per subscriber before the slowest one starts lagging
    #[cfg_attr(
        feature = "config",
        arg(long = "comfy-event-capacity", env = "COMFY_EVENT_CAPACITY", default_value_t = DEFAULT_EVENT_CAPACITY)
    )]
    pub comfy_event_capacity: usize,
}

impl Default for ComfyConfig {
    fn default() -> Self {
        Self::external(DEFAULT_URL)
    }
}

impl ComfyConfig {
    /// Creates a configuration for a server at `url`.
    pub fn external(url: impl Into<String>) -> Self {
        Self {
            comfy_mode: ServerMode::External,
            comfy_url: url.into(),
            comfy_port: DEFAULT_PORT,
            comfy_timeout_secs: DEFAULT_TIMEOUT_SECS,
            comfy_event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Creates a configuration for a local server on `port`.
    pub fn embedded(port: u16) -> Self {
        Self {
            comfy_mode: ServerMode::Embedded,
            comfy_port: port,
            ..Self::default()
        }
    }

    /// Sets the REST request timeout in seconds.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.comfy_timeout_secs = secs;
        self
    }

    /// Sets the per-subscriber event buffer size.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.comfy_event_capacity = capacity;
        self
    }

    /// Returns the REST timeout, using the default when zero.
    #[inline]
    pub fn timeout(&self) -> Duration {
        match self.comfy_timeout_secs {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Returns the event buffer size, at least one.
    #[inline]
    pub fn event_capacity(&self) -> usize {
        self.comfy_event_capacity.max(1)
    }

    /// Returns the HTTP base URL of the job engine for the configured mode.
    pub fn base_url(&self) -> Result<Url> {
        let url = match self.comfy_mode {
            ServerMode::External => Url::parse(self.comfy_url.trim())?,
            ServerMode::Embedded => Url::parse(&format!("http://127.0.0.1:{}", self.comfy_port))?,
        };

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(Error::invalid_config(format!(
                "unsupported job engine scheme `{scheme}`"
            ))),
        }
    }

    /// Returns the WebSocket endpoint (`/ws`) matching [`Self::base_url`].
    ///
    /// `http` maps to `ws` and `https` to `wss`. The client id query
    /// parameter is appended by the channel on connect.
    pub fn websocket_url(&self) -> Result<Url> {
        let mut url = self.base_url()?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| Error::invalid_config(format!("cannot use `{scheme}` for {url}")))?;

        let path = format!("{}/ws", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }
}
