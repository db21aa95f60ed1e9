//! Stream framing for the serial wormhole.
//!
//! - [`sync`]: magic-sequence synchronizer that carves frames out of a raw
//!   byte stream.

pub mod sync;
