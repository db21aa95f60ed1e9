//! TCP client session with fixed-backoff reconnection.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use wormhole_core::{Frame, FrameSynchronizer};

use super::TcpClientConfig;
use super::framing::{read_frame, write_frame};
use crate::error::InterfaceError;
use crate::traits::Transport;

/// A client session that connects to a fixed target and reconnects forever.
///
/// The stream is replaced wholesale on every failure; nothing is retried on a
/// stale socket.
pub struct TcpClientSession {
    config: TcpClientConfig,
    stream: Option<TcpStream>,
    sync: FrameSynchronizer,
    reconnects: u64,
}

impl TcpClientSession {
    /// Create a session. No connection is attempted until first use or
    /// [`connect`](Self::connect).
    pub fn new(config: TcpClientConfig) -> Self {
        Self {
            config,
            stream: None,
            sync: FrameSynchronizer::new(),
            reconnects: 0,
        }
    }

    /// Connect to the target, sleeping `reconnect_wait` between failed
    /// attempts. Returns only once connected.
    pub async fn connect(&mut self) {
        let name = &self.config.name;
        let target = &self.config.target;

        loop {
            debug!("{}: trying to connect to {}", name, target);
            match tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(target.as_str()))
                .await
            {
                Ok(Ok(stream)) => {
                    let _ = stream.set_nodelay(true);
                    info!("{}: connected to {}", name, target);
                    self.stream = Some(stream);
                    self.sync.reset();
                    return;
                }
                Ok(Err(e)) => {
                    debug!("{}: connection failed: {}", name, e);
                }
                Err(_) => {
                    debug!("{}: connection timed out", name);
                }
            }
            tokio::time::sleep(self.config.reconnect_wait).await;
        }
    }

    /// Drop the broken stream, reconnect, and hand back the transient error.
    async fn recover(&mut self, err: std::io::Error) -> InterfaceError {
        warn!(
            "{}: connection lost ({}), reconnecting to {}",
            self.config.name, err, self.config.target
        );
        self.stream = None;
        self.reconnects += 1;
        self.connect().await;
        InterfaceError::Transient(err)
    }

    async fn stream(&mut self) -> Result<&mut TcpStream, InterfaceError> {
        if self.stream.is_none() {
            self.connect().await;
        }
        self.stream.as_mut().ok_or(InterfaceError::NotConnected)
    }
}

impl Transport for TcpClientSession {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn reconnects(&self) -> u64 {
        self.reconnects
    }

    async fn establish(&mut self) {
        if self.stream.is_none() {
            self.connect().await;
        }
    }

    async fn send_frame(&mut self, frame: &Frame) -> Result<usize, InterfaceError> {
        let stream = self.stream().await?;
        match write_frame(stream, frame).await {
            Ok(n) => {
                debug!("{}: sent {} bytes", self.config.name, n);
                Ok(n)
            }
            Err(e) => Err(self.recover(e).await),
        }
    }

    async fn recv_frame(&mut self) -> Result<Frame, InterfaceError> {
        if self.stream.is_none() {
            self.connect().await;
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(InterfaceError::NotConnected);
        };
        match read_frame(stream, &mut self.sync).await {
            Ok(frame) => Ok(frame),
            Err(e) => Err(self.recover(e).await),
        }
    }

    async fn send_raw(&mut self, data: &[u8]) -> Result<usize, InterfaceError> {
        let stream = self.stream().await?;
        match stream.write_all(data).await {
            Ok(()) => Ok(data.len()),
            Err(e) => Err(self.recover(e).await),
        }
    }

    async fn recv_raw(&mut self, buf: &mut [u8]) -> Result<usize, InterfaceError> {
        let stream = self.stream().await?;
        match stream.read(buf).await {
            Ok(0) => {
                let eof = std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "peer closed the connection",
                );
                Err(self.recover(eof).await)
            }
            Ok(n) => Ok(n),
            Err(e) => Err(self.recover(e).await),
        }
    }
}
