//! TCP transport sessions carrying magic-framed traffic.
//!
//! Provides [`TcpClientSession`] (connects out, reconnects forever) and
//! [`TcpServerSession`] (listens, serves exactly one peer at a time).

pub mod client;
pub mod framing;
pub mod server;

pub use client::TcpClientSession;
pub use server::TcpServerSession;

use std::net::SocketAddr;
use std::time::Duration;

use wormhole_core::constants::DEFAULT_RECONNECT_WAIT;

/// Timeout for a single TCP connection attempt.
pub const INITIAL_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Size of the read buffer used by raw relays.
pub const TCP_RECV_BUFFER: usize = 4096;

/// Configuration for a [`TcpClientSession`].
#[derive(Debug, Clone)]
pub struct TcpClientConfig {
    /// Human-readable name used in log lines.
    pub name: String,
    /// Target `host:port`. Hostnames are resolved on every attempt.
    pub target: String,
    /// Timeout for one connection attempt.
    pub connect_timeout: Duration,
    /// Fixed delay between failed attempts.
    pub reconnect_wait: Duration,
}

impl TcpClientConfig {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            connect_timeout: INITIAL_CONNECT_TIMEOUT,
            reconnect_wait: DEFAULT_RECONNECT_WAIT,
        }
    }

    pub fn with_reconnect_wait(mut self, wait: Duration) -> Self {
        self.reconnect_wait = wait;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Configuration for a [`TcpServerSession`].
#[derive(Debug, Clone)]
pub struct TcpServerConfig {
    /// Human-readable name used in log lines.
    pub name: String,
    /// Address to bind the listener to.
    pub bind_addr: SocketAddr,
    /// Delay before retrying after a failed `accept`.
    pub reconnect_wait: Duration,
}

impl TcpServerConfig {
    pub fn new(name: impl Into<String>, bind_addr: SocketAddr) -> Self {
        Self {
            name: name.into(),
            bind_addr,
            reconnect_wait: DEFAULT_RECONNECT_WAIT,
        }
    }

    pub fn with_reconnect_wait(mut self, wait: Duration) -> Self {
        self.reconnect_wait = wait;
        self
    }
}
