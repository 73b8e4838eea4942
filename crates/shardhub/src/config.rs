//! Server and hub configuration.
//!
//! Everything has a default, so an empty TOML file (or no file at all) is a
//! valid configuration. A config file only needs the keys it changes:
//!
//! ```toml
//! bind_addr = "0.0.0.0:7000"
//! idle_timeout_secs = 30
//!
//! [hub]
//! request_timeout_ms = 2000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use shardhub_protocol::DEFAULT_MAX_FRAME_LEN;

/// Errors from loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file couldn't be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file isn't valid TOML, or has a key of the wrong type.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tuning for the hub actor and its event fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Capacity of the queue in front of the hub actor.
    pub command_queue_size: usize,

    /// Per-subscriber event buffer. A subscriber that falls this far
    /// behind starts missing events.
    pub subscriber_queue_size: usize,

    /// How long a caller waits for the hub before giving up.
    pub request_timeout_ms: u64,
}

impl HubConfig {
    /// [`request_timeout_ms`](Self::request_timeout_ms) as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            command_queue_size: 1024,
            subscriber_queue_size: 4096,
            request_timeout_ms: 5_000,
        }
    }
}

/// Configuration for [`HubServer`](crate::HubServer).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Close a connection after this many seconds without a frame from
    /// the peer. `0` disables the timeout.
    ///
    /// WebSocket pings count as frames. Events pushed to a subscriber
    /// don't, so a listen-only connection has to send `Ping` requests or
    /// transport pings to stay open.
    pub idle_timeout_secs: u64,

    /// Unregister every world server a connection registered once that
    /// connection closes.
    pub unregister_on_disconnect: bool,

    /// Inbound frames longer than this are dropped without parsing.
    pub max_frame_len: usize,

    /// Default `tracing` filter. `RUST_LOG` takes precedence.
    pub log_filter: String,

    /// Hub actor tuning.
    pub hub: HubConfig,
}

impl ServerConfig {
    /// Loads a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&text)
    }

    /// Parses a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// The idle timeout, or `None` if disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0)
            .then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7000".to_string(),
            idle_timeout_secs: 60,
            unregister_on_disconnect: true,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            log_filter: "info".to_string(),
            hub: HubConfig::default(),
        }
    }
}
