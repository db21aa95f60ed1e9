//! Async I/O for the serial wormhole.
//!
//! This crate provides the reconnecting TCP sessions that carry magic-framed
//! traffic, the serial port bridge, and the append-only traffic log.

pub mod error;
pub mod framing;
pub mod serial;
pub mod tcp;
pub mod testing;
pub mod traffic_log;
pub mod traits;

pub use error::InterfaceError;
pub use serial::SerialConfig;
pub use tcp::{TcpClientConfig, TcpClientSession, TcpServerConfig, TcpServerSession};
pub use traffic_log::TrafficLog;
pub use traits::Transport;
