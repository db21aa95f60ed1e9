//! Local device-to-device byte bridge, no network involved.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use wormhole_interfaces::{InterfaceError, TrafficLog};

use super::{DirectionReport, DirectionStats, record_traffic};

const CHUNK: usize = 256;

/// Copies every byte from `source` to `sink`, logging it on the way.
pub struct LocalBridge<R, W> {
    name: String,
    source: R,
    sink: W,
    log: TrafficLog,
    stats: DirectionStats,
}

impl<R, W> LocalBridge<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(name: impl Into<String>, source: R, sink: W, log: TrafficLog) -> Self {
        Self {
            name: name.into(),
            source,
            sink,
            log,
            stats: DirectionStats::default(),
        }
    }

    /// Run until either device fails or the source closes.
    pub async fn run(mut self) -> DirectionReport {
        let mut buf = [0u8; CHUNK];
        let result = loop {
            match self.source.read(&mut buf).await {
                Ok(0) => break Err(InterfaceError::LocalClosed),
                Ok(n) => {
                    let chunk = &buf[..n];
                    trace!("{}: {}", self.name, hex::encode(chunk));
                    record_traffic(&mut self.log, &self.name, chunk).await;
                    if let Err(e) = self.sink.write_all(chunk).await {
                        break Err(InterfaceError::local(e));
                    }
                    if let Err(e) = self.sink.flush().await {
                        break Err(InterfaceError::local(e));
                    }
                    self.stats.forwarded += 1;
                    self.stats.bytes += n as u64;
                }
                Err(e) => break Err(InterfaceError::local(e)),
            }
        };
        DirectionReport::finish(&self.name, self.stats, result)
    }
}
