//! Unframed relay directions for the sniplayer modes.
//!
//! Bytes move exactly as read, in chunks of whatever size the source yields.
//! Each direction logs what it reads before passing it on.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{trace, warn};

use wormhole_interfaces::tcp::TCP_RECV_BUFFER;
use wormhole_interfaces::{InterfaceError, TrafficLog, Transport};

use super::{DirectionReport, DirectionStats, record_traffic};

/// Local source → transport, bytes verbatim.
pub struct RawUplink<R, T> {
    name: String,
    source: R,
    session: T,
    log: TrafficLog,
    stats: DirectionStats,
}

impl<R, T> RawUplink<R, T>
where
    R: AsyncRead + Unpin + Send,
    T: Transport,
{
    pub fn new(name: impl Into<String>, source: R, session: T, log: TrafficLog) -> Self {
        Self {
            name: name.into(),
            source,
            session,
            log,
            stats: DirectionStats::default(),
        }
    }

    pub async fn run(mut self) -> DirectionReport {
        self.session.establish().await;
        let mut buf = vec![0u8; TCP_RECV_BUFFER];
        let result = loop {
            if let Err(e) = self.step(&mut buf).await {
                break Err(e);
            }
        };
        DirectionReport::finish(&self.name, self.stats, result)
    }

    async fn step(&mut self, buf: &mut [u8]) -> Result<(), InterfaceError> {
        let n = self.source.read(buf).await.map_err(InterfaceError::local)?;
        if n == 0 {
            return Err(InterfaceError::LocalClosed);
        }
        let chunk = &buf[..n];
        trace!("{}: read {}", self.name, hex::encode(chunk));
        record_traffic(&mut self.log, &self.name, chunk).await;

        match self.session.send_raw(chunk).await {
            Ok(sent) => {
                self.stats.forwarded += 1;
                self.stats.bytes += sent as u64;
                Ok(())
            }
            Err(e) if e.is_transient() => {
                warn!("{}: {} bytes lost: {}", self.name, n, e);
                self.stats.dropped += 1;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Transport → local sink, bytes verbatim.
pub struct RawDownlink<T, W> {
    name: String,
    session: T,
    sink: W,
    log: TrafficLog,
    stats: DirectionStats,
}

impl<T, W> RawDownlink<T, W>
where
    T: Transport,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(name: impl Into<String>, session: T, sink: W, log: TrafficLog) -> Self {
        Self {
            name: name.into(),
            session,
            sink,
            log,
            stats: DirectionStats::default(),
        }
    }

    pub async fn run(mut self) -> DirectionReport {
        self.session.establish().await;
        let mut buf = vec![0u8; TCP_RECV_BUFFER];
        let result = loop {
            if let Err(e) = self.step(&mut buf).await {
                break Err(e);
            }
        };
        DirectionReport::finish(&self.name, self.stats, result)
    }

    async fn step(&mut self, buf: &mut [u8]) -> Result<(), InterfaceError> {
        let n = match self.session.recv_raw(buf).await {
            Ok(n) => n,
            Err(e) if e.is_transient() => {
                warn!("{}: receive interrupted: {}", self.name, e);
                self.stats.dropped += 1;
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let chunk = &buf[..n];
        trace!("{}: received {}", self.name, hex::encode(chunk));
        record_traffic(&mut self.log, &self.name, chunk).await;

        self.sink.write_all(chunk).await.map_err(InterfaceError::local)?;
        self.sink.flush().await.map_err(InterfaceError::local)?;
        self.stats.forwarded += 1;
        self.stats.bytes += n as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wormhole_interfaces::{TcpClientConfig, TcpClientSession, TcpServerConfig, TcpServerSession};

    #[tokio::test]
    async fn raw_bytes_cross_unchanged() {
        let server = TcpServerSession::bind(TcpServerConfig::new(
            "rx",
            "127.0.0.1:0".parse().unwrap(),
        ))
        .await
        .unwrap();
        let client = TcpClientSession::new(
            TcpClientConfig::new("tx", server.local_addr().to_string())
                .with_reconnect_wait(Duration::from_millis(50)),
        );

        let (mut device_in, source) = tokio::io::duplex(64);
        let (sink, mut device_out) = tokio::io::duplex(64);

        let up = tokio::spawn(RawUplink::new("up", source, client, TrafficLog::disabled()).run());
        let down = tokio::spawn(RawDownlink::new("down", server, sink, TrafficLog::disabled()).run());

        // Not framed: a lone magic prefix passes through as-is.
        device_in.write_all(&[0x53, 0x6E, 0x01, 0x02]).await.unwrap();
        let mut buf = [0u8; 4];
        device_out.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x53, 0x6E, 0x01, 0x02]);

        // Closing the local source stops only the uplink.
        drop(device_in);
        let report = up.await.unwrap();
        assert!(report.result.is_err());
        assert_eq!(report.stats.bytes, 4);
        assert!(!down.is_finished());
        down.abort();
    }
}
