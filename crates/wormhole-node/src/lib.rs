//! Relay orchestration for the serial wormhole.
//!
//! This crate ties the framing core and the transport sessions together into
//! the sniffer, replayer, sniplayer and bridge modes, and provides the
//! configuration and logging setup for the `wormhole` binary.

pub mod config;
pub mod error;
pub mod logging;
pub mod modes;
pub mod relay;

pub use config::NodeConfig;
pub use error::NodeError;
pub use relay::{DirectionReport, DirectionStats, DuplexRelay};
