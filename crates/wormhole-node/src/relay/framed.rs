//! Magic-framed relay directions.
//!
//! The uplink carves frames out of a local byte source and sends them over a
//! transport session. The downlink receives frames from a session and writes
//! them, still framed, to a local sink. Both run every frame through a
//! [`DuplicateFilter`] and hold it back for the forward delay first.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use wormhole_core::{DuplicateFilter, FrameSynchronizer};
use wormhole_interfaces::framing::{read_frame, write_frame};
use wormhole_interfaces::{InterfaceError, TrafficLog, Transport};

use super::{DirectionReport, DirectionStats, record_traffic};

/// Timing knobs shared by both framed directions.
#[derive(Debug, Clone, Copy)]
pub struct FramedSettings {
    /// Duplicate suppression window.
    pub suppression: Duration,
    /// Pause before each frame is passed on.
    pub forward_delay: Duration,
}

/// Current time on the runtime clock, so paused-time tests drive the filter.
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

async fn forward_delay(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Local source → synchronizer → filter → transport.
pub struct FramedUplink<R, T> {
    name: String,
    source: R,
    session: T,
    sync: FrameSynchronizer,
    filter: DuplicateFilter,
    settings: FramedSettings,
    log: TrafficLog,
    stats: DirectionStats,
}

impl<R, T> FramedUplink<R, T>
where
    R: AsyncRead + Unpin + Send,
    T: Transport,
{
    pub fn new(
        name: impl Into<String>,
        source: R,
        session: T,
        settings: FramedSettings,
        log: TrafficLog,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            session,
            sync: FrameSynchronizer::new(),
            filter: DuplicateFilter::new(settings.suppression),
            settings,
            log,
            stats: DirectionStats::default(),
        }
    }

    /// Run until the local source fails or closes.
    pub async fn run(mut self) -> DirectionReport {
        self.session.establish().await;
        let result = loop {
            if let Err(e) = self.step().await {
                break Err(e);
            }
        };
        DirectionReport::finish(&self.name, self.stats, result)
    }

    async fn step(&mut self) -> Result<(), InterfaceError> {
        let frame = read_frame(&mut self.source, &mut self.sync)
            .await
            .map_err(InterfaceError::local)?;

        if !self.filter.check(&frame, now()) {
            self.stats.suppressed = self.filter.suppressed();
            debug!("{}: suppressed duplicate frame {}", self.name, hex::encode(frame.as_bytes()));
            return Ok(());
        }

        forward_delay(self.settings.forward_delay).await;

        match self.session.send_frame(&frame).await {
            Ok(n) => {
                info!("{}: forwarded frame {}", self.name, hex::encode(frame.as_bytes()));
                self.stats.forwarded += 1;
                self.stats.bytes += n as u64;
                record_traffic(&mut self.log, &self.name, &frame.encode()).await;
                self.filter.record(frame, now());
                Ok(())
            }
            Err(e) if e.is_transient() => {
                warn!("{}: frame {} lost: {}", self.name, hex::encode(frame.as_bytes()), e);
                self.stats.dropped += 1;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Transport → filter → framed writes to a local sink.
pub struct FramedDownlink<T, W> {
    name: String,
    session: T,
    sink: W,
    filter: DuplicateFilter,
    settings: FramedSettings,
    log: TrafficLog,
    stats: DirectionStats,
}

impl<T, W> FramedDownlink<T, W>
where
    T: Transport,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(
        name: impl Into<String>,
        session: T,
        sink: W,
        settings: FramedSettings,
        log: TrafficLog,
    ) -> Self {
        Self {
            name: name.into(),
            session,
            sink,
            filter: DuplicateFilter::new(settings.suppression),
            settings,
            log,
            stats: DirectionStats::default(),
        }
    }

    /// Run until the local sink fails.
    pub async fn run(mut self) -> DirectionReport {
        self.session.establish().await;
        let result = loop {
            if let Err(e) = self.step().await {
                break Err(e);
            }
        };
        DirectionReport::finish(&self.name, self.stats, result)
    }

    async fn step(&mut self) -> Result<(), InterfaceError> {
        let frame = match self.session.recv_frame().await {
            Ok(frame) => frame,
            Err(e) if e.is_transient() => {
                warn!("{}: receive interrupted: {}", self.name, e);
                self.stats.dropped += 1;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if !self.filter.check(&frame, now()) {
            self.stats.suppressed = self.filter.suppressed();
            debug!("{}: suppressed duplicate frame {}", self.name, hex::encode(frame.as_bytes()));
            return Ok(());
        }

        forward_delay(self.settings.forward_delay).await;

        let n = write_frame(&mut self.sink, &frame)
            .await
            .map_err(InterfaceError::local)?;
        info!("{}: replayed frame {}", self.name, hex::encode(frame.as_bytes()));
        self.stats.forwarded += 1;
        self.stats.bytes += n as u64;
        record_traffic(&mut self.log, &self.name, &frame.encode()).await;
        self.filter.record(frame, now());
        Ok(())
    }
}
