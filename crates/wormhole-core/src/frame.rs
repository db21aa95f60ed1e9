//! The frame payload type and its wire encoding.
//!
//! Wire format: `MAGIC (4) + length (1) + payload (length)`. A length of zero
//! is a heartbeat with no payload; it never produces a [`Frame`].

use std::fmt;

use crate::constants::{HEADER_LEN, MAGIC, MAX_FRAME_LEN};
use crate::error::FramingError;

/// An immutable frame payload of 1 to 255 bytes.
///
/// The magic sequence and length byte are not part of the payload. Equality
/// is full byte equality.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Frame(Vec<u8>);

impl Frame {
    /// Wrap a payload, rejecting empty or oversize ones.
    pub fn new(payload: impl Into<Vec<u8>>) -> Result<Self, FramingError> {
        let payload = payload.into();
        if payload.is_empty() {
            return Err(FramingError::EmptyFrame);
        }
        if payload.len() > MAX_FRAME_LEN {
            return Err(FramingError::FrameTooLong {
                max: MAX_FRAME_LEN,
                actual: payload.len(),
            });
        }
        Ok(Self(payload))
    }

    /// Wrap a payload whose length the caller has already bounded to 1..=255.
    pub(crate) fn from_checked(payload: Vec<u8>) -> Self {
        debug_assert!(!payload.is_empty() && payload.len() <= MAX_FRAME_LEN);
        Self(payload)
    }

    /// Payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Payload length as written in the length byte.
    pub fn len_byte(&self) -> u8 {
        // Bounded by construction.
        self.0.len() as u8
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false: a frame carries at least one byte.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode as `MAGIC + length + payload`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.0.len());
        out.extend_from_slice(&MAGIC);
        out.push(self.len_byte());
        out.extend_from_slice(&self.0);
        out
    }

    /// Encoded size on the wire.
    pub fn wire_len(&self) -> usize {
        HEADER_LEN + self.0.len()
    }

    /// Encoding of the zero-length heartbeat transmission.
    pub fn heartbeat() -> [u8; HEADER_LEN] {
        [MAGIC[0], MAGIC[1], MAGIC[2], MAGIC[3], 0]
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", hex::encode(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_oversize() {
        assert_eq!(Frame::new(Vec::new()), Err(FramingError::EmptyFrame));
        assert_eq!(
            Frame::new(vec![0u8; 256]),
            Err(FramingError::FrameTooLong {
                max: 255,
                actual: 256
            })
        );
        assert_eq!(Frame::new(vec![0u8; 255]).unwrap().len(), 255);
    }

    #[test]
    fn encode_matches_wire_layout() {
        let frame = Frame::new(vec![0xAA, 0xBB, 0xCC]).unwrap();
        assert_eq!(
            frame.encode(),
            vec![0x53, 0x6E, 0x69, 0x66, 0x03, 0xAA, 0xBB, 0xCC]
        );
        assert_eq!(frame.wire_len(), 8);
    }

    #[test]
    fn heartbeat_is_zero_length() {
        assert_eq!(Frame::heartbeat(), [0x53, 0x6E, 0x69, 0x66, 0x00]);
    }

    #[test]
    fn debug_renders_hex() {
        let frame = Frame::new(vec![0xDE, 0xAD]).unwrap();
        assert_eq!(format!("{frame:?}"), "Frame(dead)");
    }
}
