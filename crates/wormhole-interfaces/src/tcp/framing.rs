//! Re-export of the shared async frame reader and writer.
//!
//! The implementation lives in [`crate::framing`] so it can be shared with
//! relay directions that write frames to serial sinks.

pub use crate::framing::*;
