//! TOML-based configuration for the wormhole relay.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use wormhole_core::constants::{
    DEFAULT_FORWARD_DELAY, DEFAULT_RECONNECT_WAIT, DEFAULT_REPLAYER_SUPPRESSION,
    DEFAULT_SNIFFER_SUPPRESSION,
};
use wormhole_interfaces::SerialConfig;
use wormhole_interfaces::tcp::INITIAL_CONNECT_TIMEOUT;

use crate::error::NodeError;

/// Top-level configuration loaded from a TOML file.
///
/// Every section is optional; an empty file yields the stock defaults.
#[derive(Debug, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub bridge: BridgeSection,
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub timing: TimingSection,
    #[serde(default)]
    pub traffic_log: TrafficLogSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s)
            .map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), NodeError> {
        self.serial
            .validate()
            .map_err(|e| NodeError::Config(format!("[serial]: {e}")))?;
        for (key, addr) in [
            ("bind", &self.network.bind),
            ("send_bind", &self.network.send_bind),
            ("recv_bind", &self.network.recv_bind),
        ] {
            parse_socket_addr(addr)
                .map_err(|e| NodeError::Config(format!("[network] {key}: {e}")))?;
        }
        for (key, target) in [
            ("target", &self.network.target),
            ("send_target", &self.network.send_target),
            ("recv_target", &self.network.recv_target),
        ] {
            if !target.contains(':') {
                return Err(NodeError::Config(format!(
                    "[network] {key}: expected host:port, got '{target}'"
                )));
            }
        }
        Ok(())
    }

    /// Line settings for the bridge output port: the `[serial]` settings with
    /// the port path swapped.
    pub fn bridge_output(&self) -> Result<SerialConfig, NodeError> {
        let port = self.bridge.output_port.clone().ok_or_else(|| {
            NodeError::Config("[bridge] output_port is required for bridge mode".into())
        })?;
        Ok(SerialConfig {
            port,
            ..self.serial.clone()
        })
    }
}

/// The `[bridge]` section.
#[derive(Debug, Default, Deserialize)]
pub struct BridgeSection {
    pub output_port: Option<String>,
}

/// The `[network]` section.
///
/// `target`/`bind` serve the framed modes; the `send_*`/`recv_*` pairs serve
/// the raw sniplayer modes, which use one connection per direction.
#[derive(Debug, Deserialize)]
pub struct NetworkSection {
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_target")]
    pub send_target: String,
    #[serde(default = "default_recv_target")]
    pub recv_target: String,
    #[serde(default = "default_send_bind")]
    pub send_bind: String,
    #[serde(default = "default_bind")]
    pub recv_bind: String,
}

fn default_target() -> String {
    "127.0.0.1:9999".to_string()
}

fn default_recv_target() -> String {
    "127.0.0.1:8888".to_string()
}

fn default_bind() -> String {
    "0.0.0.0:9999".to_string()
}

fn default_send_bind() -> String {
    "0.0.0.0:8888".to_string()
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            target: default_target(),
            bind: default_bind(),
            send_target: default_target(),
            recv_target: default_recv_target(),
            send_bind: default_send_bind(),
            recv_bind: default_bind(),
        }
    }
}

impl NetworkSection {
    pub fn bind_addr(&self) -> Result<SocketAddr, NodeError> {
        parse_socket_addr(&self.bind)
    }

    pub fn send_bind_addr(&self) -> Result<SocketAddr, NodeError> {
        parse_socket_addr(&self.send_bind)
    }

    pub fn recv_bind_addr(&self) -> Result<SocketAddr, NodeError> {
        parse_socket_addr(&self.recv_bind)
    }
}

/// The `[timing]` section. All values are milliseconds.
#[derive(Debug, Deserialize)]
pub struct TimingSection {
    #[serde(default = "default_reconnect_wait_ms")]
    pub reconnect_wait_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_forward_delay_ms")]
    pub forward_delay_ms: u64,
    #[serde(default = "default_sniffer_suppression_ms")]
    pub sniffer_suppression_ms: u64,
    #[serde(default = "default_replayer_suppression_ms")]
    pub replayer_suppression_ms: u64,
}

fn default_reconnect_wait_ms() -> u64 {
    DEFAULT_RECONNECT_WAIT.as_millis() as u64
}

fn default_connect_timeout_ms() -> u64 {
    INITIAL_CONNECT_TIMEOUT.as_millis() as u64
}

fn default_forward_delay_ms() -> u64 {
    DEFAULT_FORWARD_DELAY.as_millis() as u64
}

fn default_sniffer_suppression_ms() -> u64 {
    DEFAULT_SNIFFER_SUPPRESSION.as_millis() as u64
}

fn default_replayer_suppression_ms() -> u64 {
    DEFAULT_REPLAYER_SUPPRESSION.as_millis() as u64
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            reconnect_wait_ms: default_reconnect_wait_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            forward_delay_ms: default_forward_delay_ms(),
            sniffer_suppression_ms: default_sniffer_suppression_ms(),
            replayer_suppression_ms: default_replayer_suppression_ms(),
        }
    }
}

impl TimingSection {
    pub fn reconnect_wait(&self) -> Duration {
        Duration::from_millis(self.reconnect_wait_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn forward_delay(&self) -> Duration {
        Duration::from_millis(self.forward_delay_ms)
    }

    pub fn sniffer_suppression(&self) -> Duration {
        Duration::from_millis(self.sniffer_suppression_ms)
    }

    pub fn replayer_suppression(&self) -> Duration {
        Duration::from_millis(self.replayer_suppression_ms)
    }
}

/// The `[traffic_log]` section.
#[derive(Debug, Deserialize)]
pub struct TrafficLogSection {
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_log_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_enabled() -> bool {
    true
}

impl Default for TrafficLogSection {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            enabled: default_enabled(),
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Parse a socket address string like "0.0.0.0:9999".
pub fn parse_socket_addr(s: &str) -> Result<SocketAddr, NodeError> {
    s.parse()
        .map_err(|e| NodeError::Config(format!("invalid socket address '{s}': {e}")))
}
