//! Byte-at-a-time frame synchronizer.
//!
//! Recognizes the magic sequence in an unstructured byte stream, reads the
//! one-byte length, then collects that many payload bytes:
//!
//! ```text
//! Idle --M[0]--> Matched1 --M[1]--> Matched2 --M[2]--> Matched3 --M[3]--> ReadLength
//! ReadLength --0--> Idle                      (heartbeat, nothing emitted)
//! ReadLength --n--> ReadPayload --n bytes--> emit Frame, Idle
//! ```
//!
//! A byte that breaks a partial magic match resets the machine. The byte is
//! only reconsidered as the first magic byte: if it equals `M[0]` the machine
//! lands in `Matched1`, otherwise in `Idle`. Bytes inside a payload are never
//! inspected for magic.

use tracing::trace;

use crate::constants::MAGIC;
use crate::frame::Frame;

/// Position of the synchronizer within the frame grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Matched1,
    Matched2,
    Matched3,
    ReadLength,
    ReadPayload,
}

/// Stateful frame synchronizer fed one byte at a time.
///
/// Owns only the in-progress frame; it has no identity across frames and
/// returns to [`SyncState::Idle`] after every completed frame, heartbeat, or
/// unexpected byte.
#[derive(Debug, Clone)]
pub struct FrameSynchronizer {
    state: SyncState,
    expected: usize,
    payload: Vec<u8>,
    discarded: u64,
    heartbeats: u64,
}

impl FrameSynchronizer {
    pub fn new() -> Self {
        Self {
            state: SyncState::Idle,
            expected: 0,
            payload: Vec::new(),
            discarded: 0,
            heartbeats: 0,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Payload bytes still needed before the current frame completes.
    ///
    /// Zero unless the machine is in [`SyncState::ReadPayload`].
    pub fn payload_remaining(&self) -> usize {
        match self.state {
            SyncState::ReadPayload => self.expected - self.payload.len(),
            _ => 0,
        }
    }

    /// Number of bytes dropped outside of any frame since creation.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Number of zero-length heartbeats absorbed since creation.
    pub fn heartbeats(&self) -> u64 {
        self.heartbeats
    }

    /// Consume one byte, returning a frame when its last payload byte arrives.
    pub fn feed(&mut self, byte: u8) -> Option<Frame> {
        match self.state {
            SyncState::Idle => {
                if byte == MAGIC[0] {
                    self.state = SyncState::Matched1;
                } else {
                    self.discarded += 1;
                }
                None
            }
            SyncState::Matched1 => self.advance_magic(byte, 1, SyncState::Matched2),
            SyncState::Matched2 => self.advance_magic(byte, 2, SyncState::Matched3),
            SyncState::Matched3 => self.advance_magic(byte, 3, SyncState::ReadLength),
            SyncState::ReadLength => {
                if byte == 0 {
                    trace!("heartbeat absorbed");
                    self.heartbeats += 1;
                    self.state = SyncState::Idle;
                } else {
                    self.expected = byte as usize;
                    self.payload.clear();
                    self.payload.reserve(self.expected);
                    self.state = SyncState::ReadPayload;
                }
                None
            }
            SyncState::ReadPayload => {
                self.payload.push(byte);
                if self.payload.len() == self.expected {
                    self.state = SyncState::Idle;
                    let payload = std::mem::take(&mut self.payload);
                    return Some(Frame::from_checked(payload));
                }
                None
            }
        }
    }

    /// Feed a run of bytes, collecting every frame completed along the way.
    pub fn feed_slice(&mut self, data: &[u8]) -> Vec<Frame> {
        data.iter().filter_map(|&b| self.feed(b)).collect()
    }

    /// Drop any partial frame and return to [`SyncState::Idle`].
    pub fn reset(&mut self) {
        self.state = SyncState::Idle;
        self.expected = 0;
        self.payload.clear();
    }

    fn advance_magic(&mut self, byte: u8, index: usize, next: SyncState) -> Option<Frame> {
        if byte == MAGIC[index] {
            self.state = next;
        } else {
            trace!(
                "magic mismatch at position {}: 0x{:02x}, resynchronizing",
                index, byte
            );
            // The matched prefix plus this byte leave the stream unused.
            self.discarded += index as u64;
            if byte == MAGIC[0] {
                self.state = SyncState::Matched1;
            } else {
                self.discarded += 1;
                self.state = SyncState::Idle;
            }
        }
        None
    }
}

impl Default for FrameSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}
