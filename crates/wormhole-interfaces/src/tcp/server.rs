//! TCP server session that serves exactly one peer at a time.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{debug, info, warn};

use wormhole_core::{Frame, FrameSynchronizer};

use super::TcpServerConfig;
use super::framing::{read_frame, write_frame};
use crate::error::InterfaceError;
use crate::traits::Transport;

/// Listen backlog: only one peer is expected.
const LISTEN_BACKLOG: u32 = 1;

/// A server session bound to a local address.
///
/// Accepts one connection and uses it until an operation on it fails, then
/// accepts a replacement. Further peers wait in the backlog meanwhile.
pub struct TcpServerSession {
    config: TcpServerConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    conn: Option<(TcpStream, SocketAddr)>,
    sync: FrameSynchronizer,
    reconnects: u64,
}

impl TcpServerSession {
    /// Bind the listener. Fails only if the address cannot be bound.
    pub async fn bind(config: TcpServerConfig) -> Result<Self, InterfaceError> {
        let socket = if config.bind_addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(config.bind_addr)?;
        let listener = socket.listen(LISTEN_BACKLOG)?;

        let local_addr = listener.local_addr()?;
        info!("{}: listening on {}", config.name, local_addr);

        Ok(Self {
            config,
            listener,
            local_addr,
            conn: None,
            sync: FrameSynchronizer::new(),
            reconnects: 0,
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address of the peer currently served, if any.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.conn.as_ref().map(|(_, addr)| *addr)
    }

    /// Wait for the next peer and make it the current connection.
    pub async fn accept(&mut self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let _ = stream.set_nodelay(true);
                    info!("{}: connected to {}", self.config.name, peer_addr);
                    self.conn = Some((stream, peer_addr));
                    self.sync.reset();
                    return;
                }
                Err(e) => {
                    warn!("{}: accept error: {}", self.config.name, e);
                    tokio::time::sleep(self.config.reconnect_wait).await;
                }
            }
        }
    }

    /// Drop the failed peer, accept a new one, and hand back the transient error.
    async fn recover(&mut self, err: std::io::Error) -> InterfaceError {
        match self.conn.take() {
            Some((_, addr)) => warn!("{}: lost connection with {} ({})", self.config.name, addr, err),
            None => debug!("{}: no connection to drop ({})", self.config.name, err),
        }
        self.reconnects += 1;
        self.accept().await;
        InterfaceError::Transient(err)
    }

    async fn stream(&mut self) -> Result<&mut TcpStream, InterfaceError> {
        if self.conn.is_none() {
            self.accept().await;
        }
        self.conn
            .as_mut()
            .map(|(stream, _)| stream)
            .ok_or(InterfaceError::NotConnected)
    }
}

impl Transport for TcpServerSession {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn reconnects(&self) -> u64 {
        self.reconnects
    }

    async fn establish(&mut self) {
        if self.conn.is_none() {
            self.accept().await;
        }
    }

    async fn send_frame(&mut self, frame: &Frame) -> Result<usize, InterfaceError> {
        let stream = self.stream().await?;
        match write_frame(stream, frame).await {
            Ok(n) => Ok(n),
            Err(e) => Err(self.recover(e).await),
        }
    }

    async fn recv_frame(&mut self) -> Result<Frame, InterfaceError> {
        if self.conn.is_none() {
            self.accept().await;
        }
        let Some((stream, _)) = self.conn.as_mut() else {
            return Err(InterfaceError::NotConnected);
        };
        match read_frame(stream, &mut self.sync).await {
            Ok(frame) => {
                debug!(
                    "{}: received frame of {} bytes: {}",
                    self.config.name,
                    frame.len(),
                    hex::encode(frame.as_bytes())
                );
                Ok(frame)
            }
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn bind_local(name: &str) -> TcpServerSession {
        let config = TcpServerConfig::new(name, "127.0.0.1:0".parse().unwrap())
            .with_reconnect_wait(Duration::from_millis(50));
        TcpServerSession::bind(config).await.unwrap()
    }

    #[tokio::test]
    async fn server_receives_frame() {
        let mut server = bind_local("test-server").await;
        let addr = server.local_addr();

        let mut peer = TcpStream::connect(addr).await.unwrap();
        peer.write_all(&[0x53, 0x6E, 0x69, 0x66, 0x03, 0xAA, 0xBB, 0xCC])
            .await
            .unwrap();

        let frame = server.recv_frame().await.unwrap();
        assert_eq!(frame.as_bytes(), &[0xAA, 0xBB, 0xCC]);
        assert!(server.is_connected());
        assert_eq!(server.peer_addr(), Some(peer.local_addr().unwrap()));
    }

    #[tokio::test]
    async fn server_conformance() {
        let mut server = bind_local("conformance").await;
        crate::testing::assert_pre_establish_conformance(&server);

        let mut peer = TcpStream::connect(server.local_addr()).await.unwrap();
        server.establish().await;
        crate::testing::assert_frame_exchange(&mut server, &mut peer).await;
    }

    #[tokio::test]
    async fn server_replaces_peer_after_disconnect() {
        let mut server = bind_local("test-replace").await;
        let addr = server.local_addr();

        let first = TcpStream::connect(addr).await.unwrap();
        server.establish().await;
        drop(first);

        let connector = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let mut second = TcpStream::connect(addr).await.unwrap();
            second
                .write_all(&[0x53, 0x6E, 0x69, 0x66, 0x01, 0x42])
                .await
                .unwrap();
            second
        });

        crate::testing::assert_transient(server.recv_frame().await);
        assert_eq!(server.reconnects(), 1);

        let frame = server.recv_frame().await.unwrap();
        assert_eq!(frame.as_bytes(), &[0x42]);
        let _second = connector.await.unwrap();
    }

    #[tokio::test]
    async fn server_sends_raw_to_peer() {
        let mut server = bind_local("test-raw").await;
        let addr = server.local_addr();

        let mut peer = TcpStream::connect(addr).await.unwrap();
        let sent = server.send_raw(b"abc").await.unwrap();
        assert_eq!(sent, 3);

        let mut buf = [0u8; 3];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"abc");
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let server = bind_local("test-first").await;
        let config = TcpServerConfig::new("test-second", server.local_addr());
        // A live listener on the port blocks a second bind even with SO_REUSEADDR.
        let result = TcpServerSession::bind(config).await;
        assert!(matches!(result, Err(InterfaceError::Io(_))));
    }
}
