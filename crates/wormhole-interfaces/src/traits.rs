//! The transport session trait shared by client and server roles.

use wormhole_core::Frame;

use crate::error::InterfaceError;

/// A single-peer network session that survives link failures.
///
/// A session is owned by exactly one relay direction. Every operation either
/// completes on a fully established connection or first waits until one
/// exists. When the link fails mid-operation the session tears the connection
/// down, re-establishes it (client: reconnect, server: accept a new peer), and
/// returns [`InterfaceError::Transient`]; the data in flight is lost.
pub trait Transport: Send {
    /// Human-readable name for this session.
    fn name(&self) -> &str;

    /// Whether a peer connection is currently held.
    fn is_connected(&self) -> bool;

    /// Number of times the connection has been rebuilt after a failure.
    fn reconnects(&self) -> u64;

    /// Wait until a peer connection exists. Retries forever.
    fn establish(&mut self) -> impl Future<Output = ()> + Send;

    /// Transmit one frame as `MAGIC + length + payload`.
    ///
    /// Returns the number of bytes written.
    fn send_frame(&mut self, frame: &Frame)
    -> impl Future<Output = Result<usize, InterfaceError>> + Send;

    /// Receive the next complete frame, absorbing heartbeats and noise.
    fn recv_frame(&mut self) -> impl Future<Output = Result<Frame, InterfaceError>> + Send;

    /// Transmit bytes verbatim.
    fn send_raw(&mut self, data: &[u8])
    -> impl Future<Output = Result<usize, InterfaceError>> + Send;

    /// Receive whatever bytes are available, at least one.
    fn recv_raw(&mut self, buf: &mut [u8])
    -> impl Future<Output = Result<usize, InterfaceError>> + Send;
}
