//! Error types for the wormhole-core crate.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// A frame must carry at least one payload byte.
    EmptyFrame,
    /// Payload does not fit in a single length byte.
    FrameTooLong { max: usize, actual: usize },
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramingError::EmptyFrame => write!(f, "frame payload is empty"),
            FramingError::FrameTooLong { max, actual } => {
                write!(f, "frame too long: at most {max} bytes, got {actual}")
            }
        }
    }
}

impl std::error::Error for FramingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_variants() {
        assert_eq!(FramingError::EmptyFrame.to_string(), "frame payload is empty");
        let long = FramingError::FrameTooLong { max: 255, actual: 300 };
        assert!(long.to_string().contains("300"));
    }
}
