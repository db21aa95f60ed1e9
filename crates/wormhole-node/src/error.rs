//! Error types for the relay orchestrator.

use wormhole_interfaces::InterfaceError;

/// Errors that can occur while running a relay.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("interface error: {0}")]
    Interface(#[from] InterfaceError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A relay direction stopped on a non-recoverable error.
    #[error("direction {direction} stopped: {source}")]
    DirectionFailed {
        direction: String,
        #[source]
        source: InterfaceError,
    },
    #[error("relay task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl NodeError {
    pub fn direction(direction: impl Into<String>, source: InterfaceError) -> Self {
        NodeError::DirectionFailed {
            direction: direction.into(),
            source,
        }
    }
}
