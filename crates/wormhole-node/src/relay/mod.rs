//! Relay directions and the task pair that runs them.
//!
//! A direction owns everything it touches: its local endpoint, its transport
//! session, its synchronizer and duplicate filter, and its traffic log. Two
//! directions never share mutable state, so a reconnect on one side never
//! stalls the other.

pub mod bridge;
pub mod framed;
pub mod raw;

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use wormhole_interfaces::{InterfaceError, TrafficLog};

use crate::error::NodeError;

/// Counters kept by one relay direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectionStats {
    /// Frames or chunks delivered to the far side.
    pub forwarded: u64,
    /// Frames withheld by the duplicate filter.
    pub suppressed: u64,
    /// Frames or chunks lost to a broken link.
    pub dropped: u64,
    /// Bytes delivered, including framing overhead.
    pub bytes: u64,
}

/// How a direction ended.
#[derive(Debug)]
pub struct DirectionReport {
    pub name: String,
    pub stats: DirectionStats,
    pub result: Result<(), NodeError>,
}

impl DirectionReport {
    pub(crate) fn finish(name: &str, stats: DirectionStats, result: Result<(), InterfaceError>) -> Self {
        match &result {
            Ok(()) => info!(
                "{}: finished after {} forwarded, {} suppressed, {} dropped",
                name, stats.forwarded, stats.suppressed, stats.dropped
            ),
            Err(e) => error!("{}: stopped: {}", name, e),
        }
        Self {
            name: name.to_string(),
            stats,
            result: result.map_err(|e| NodeError::direction(name, e)),
        }
    }
}

/// Append to a traffic log without letting a log failure stop the traffic.
pub(crate) async fn record_traffic(log: &mut TrafficLog, name: &str, data: &[u8]) {
    if let Err(e) = log.append(data).await {
        warn!("{}: traffic log write failed: {}", name, e);
    }
}

/// Up to two independently running relay directions.
pub struct DuplexRelay {
    tasks: Vec<JoinHandle<DirectionReport>>,
}

impl DuplexRelay {
    /// Start both directions as separate tasks.
    pub fn spawn<U, D>(uplink: U, downlink: D) -> Self
    where
        U: Future<Output = DirectionReport> + Send + 'static,
        D: Future<Output = DirectionReport> + Send + 'static,
    {
        Self {
            tasks: vec![tokio::spawn(uplink), tokio::spawn(downlink)],
        }
    }

    /// Start a relay that only moves data one way.
    pub fn one_way<F>(direction: F) -> Self
    where
        F: Future<Output = DirectionReport> + Send + 'static,
    {
        Self {
            tasks: vec![tokio::spawn(direction)],
        }
    }

    /// Wait for every direction to end and collect their reports.
    ///
    /// A direction ending does not stop the others.
    pub async fn join(self) -> Result<Vec<DirectionReport>, NodeError> {
        let mut reports = Vec::with_capacity(self.tasks.len());
        for task in self.tasks {
            reports.push(task.await?);
        }
        Ok(reports)
    }

    /// Cancel all directions.
    pub fn abort(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(JoinHandle::is_finished)
    }
}
