//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub watcher: WatcherConfig,

    #[serde(default)]
    pub channel: ChannelConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub document: DocumentConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Mutation watcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Trailing-edge quiescence window before a tick runs.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    100
}

/// Cross-context channel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Upper bound for awaiting a response. Unset means wait until the
    /// response arrives, the call is cancelled or the transport closes.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

/// Peer relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Pending message cap per peer.
    #[serde(default = "default_max_queue")]
    pub max_queue: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_queue: default_max_queue(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_max_queue() -> usize {
    1024
}

/// Outbound fetch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_fetch_timeout(),
        }
    }
}

fn default_user_agent() -> String {
    "pagelink/0.1".to_string()
}

fn default_fetch_timeout() -> u64 {
    60
}

/// Host document defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
        }
    }
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    720
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,

    /// Daily-rolling log file; stderr only when unset.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.watcher.debounce_ms, 100);
        assert!(config.channel.request_timeout_ms.is_none());
        assert_eq!(config.relay.poll_interval_ms, 250);
        assert_eq!(config.relay.max_queue, 1024);
        assert_eq!(config.document.viewport_width, 1280);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config: Config = toml::from_str("[relay]\nmax_queue = 8\n").unwrap();
        assert_eq!(config.relay.max_queue, 8);
        assert_eq!(config.relay.poll_interval_ms, 250);
    }
}
