//! Error types for the interfaces layer.

/// Errors that can occur during interface operations.
///
/// Relay directions only recover from [`is_transient`](Self::is_transient)
/// errors. Everything else stops the direction that hit it.
#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The network link failed mid-operation. The session has already been
    /// rebuilt; the data in flight was lost.
    #[error("transport interrupted, session re-established: {0}")]
    Transient(#[source] std::io::Error),
    #[error("local device closed")]
    LocalClosed,
    #[error("local device I/O error: {0}")]
    LocalIo(#[source] std::io::Error),
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("interface not connected")]
    NotConnected,
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl InterfaceError {
    /// Whether the caller should drop the current unit of work and carry on.
    pub fn is_transient(&self) -> bool {
        matches!(self, InterfaceError::Transient(_))
    }

    /// Classify an I/O error from a local source or sink.
    pub fn local(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            InterfaceError::LocalClosed
        } else {
            InterfaceError::LocalIo(err)
        }
    }
}
