//! Core types and wire framing for the serial wormhole.
//!
//! This crate defines the frame wire format, the byte-at-a-time frame
//! synchronizer, duplicate suppression, and the replayer control command.
//! Nothing here performs I/O; the interfaces and node crates drive these
//! types from async byte streams.

pub mod command;
pub mod constants;
pub mod error;
pub mod filter;
pub mod frame;
pub mod framing;

pub use command::RadioCommand;
pub use constants::MAGIC;
pub use error::FramingError;
pub use filter::DuplicateFilter;
pub use frame::Frame;
pub use framing::sync::{FrameSynchronizer, SyncState};
