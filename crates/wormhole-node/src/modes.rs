//! Wiring of the operating modes.
//!
//! Each function takes the already opened local device so the same wiring
//! runs against a serial port in production and an in-memory pipe in tests.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

use wormhole_core::RadioCommand;
use wormhole_interfaces::{
    SerialConfig, TcpClientConfig, TcpClientSession, TcpServerConfig, TcpServerSession,
    TrafficLog, serial,
};

use crate::config::{NodeConfig, TimingSection};
use crate::error::NodeError;
use crate::relay::DuplexRelay;
use crate::relay::bridge::LocalBridge;
use crate::relay::framed::{FramedDownlink, FramedSettings, FramedUplink};
use crate::relay::raw::{RawDownlink, RawUplink};

pub const SNIFFER_LOG: &str = "sniffer.log";
pub const REPLAYER_LOG: &str = "replayer.log";
pub const CLIENT_SNIF_LOG: &str = "client_snif.log";
pub const CLIENT_RPLY_LOG: &str = "client_rply.log";
pub const SERVER_SNIF_LOG: &str = "server_snif.log";
pub const SERVER_RPLY_LOG: &str = "server_rply.log";
pub const BRIDGE_LOG: &str = "sniplayer2.log";

fn client_config(name: &str, target: &str, timing: &TimingSection) -> TcpClientConfig {
    TcpClientConfig::new(name, target)
        .with_reconnect_wait(timing.reconnect_wait())
        .with_connect_timeout(timing.connect_timeout())
}

async fn bind_server(
    name: &str,
    addr: std::net::SocketAddr,
    timing: &TimingSection,
) -> Result<TcpServerSession, NodeError> {
    let config = TcpServerConfig::new(name, addr).with_reconnect_wait(timing.reconnect_wait());
    Ok(TcpServerSession::bind(config).await?)
}

async fn traffic_log(config: &NodeConfig, file_name: &str) -> Result<TrafficLog, NodeError> {
    let section = &config.traffic_log;
    if section.enabled {
        tokio::fs::create_dir_all(&section.directory).await?;
    }
    Ok(TrafficLog::in_dir(&section.directory, file_name, section.enabled).await?)
}

/// Capture side: frames read from `source` go to the replayer at
/// `network.target`.
pub async fn sniffer<R>(config: &NodeConfig, source: R) -> Result<DuplexRelay, NodeError>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let timing = &config.timing;
    let session = TcpClientSession::new(client_config("sniffer", &config.network.target, timing));
    let settings = FramedSettings {
        suppression: timing.sniffer_suppression(),
        forward_delay: timing.forward_delay(),
    };
    let log = traffic_log(config, SNIFFER_LOG).await?;

    info!("sniffer: forwarding frames to {}", config.network.target);
    let uplink = FramedUplink::new("sniffer", source, session, settings, log);
    Ok(DuplexRelay::one_way(uplink.run()))
}

/// Replay side: frames received on `network.bind` are written to `sink`.
pub async fn replayer<W>(config: &NodeConfig, sink: W) -> Result<DuplexRelay, NodeError>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let timing = &config.timing;
    let session = bind_server("replayer", config.network.bind_addr()?, timing).await?;
    let settings = FramedSettings {
        suppression: timing.replayer_suppression(),
        forward_delay: timing.forward_delay(),
    };
    let log = traffic_log(config, REPLAYER_LOG).await?;

    let downlink = FramedDownlink::new("replayer", session, sink, settings, log);
    Ok(DuplexRelay::one_way(downlink.run()))
}

/// Raw duplex bridge, connecting side. Sends on `send_target`, receives on
/// `recv_target`.
pub async fn sniplayer_client<D>(config: &NodeConfig, device: D) -> Result<DuplexRelay, NodeError>
where
    D: AsyncRead + AsyncWrite + Send + 'static,
{
    let timing = &config.timing;
    let (source, sink) = tokio::io::split(device);
    let send = TcpClientSession::new(client_config("client-send", &config.network.send_target, timing));
    let recv = TcpClientSession::new(client_config("client-recv", &config.network.recv_target, timing));

    let uplink = RawUplink::new("client-snif", source, send, traffic_log(config, CLIENT_SNIF_LOG).await?);
    let downlink = RawDownlink::new("client-rply", recv, sink, traffic_log(config, CLIENT_RPLY_LOG).await?);
    Ok(DuplexRelay::spawn(uplink.run(), downlink.run()))
}

/// Raw duplex bridge, listening side. Sends on `send_bind`, receives on
/// `recv_bind`.
pub async fn sniplayer_server<D>(config: &NodeConfig, device: D) -> Result<DuplexRelay, NodeError>
where
    D: AsyncRead + AsyncWrite + Send + 'static,
{
    let timing = &config.timing;
    let (source, sink) = tokio::io::split(device);
    let send = bind_server("server-send", config.network.send_bind_addr()?, timing).await?;
    let recv = bind_server("server-recv", config.network.recv_bind_addr()?, timing).await?;

    let uplink = RawUplink::new("server-snif", source, send, traffic_log(config, SERVER_SNIF_LOG).await?);
    let downlink = RawDownlink::new("server-rply", recv, sink, traffic_log(config, SERVER_RPLY_LOG).await?);
    Ok(DuplexRelay::spawn(uplink.run(), downlink.run()))
}

/// Local bridge: every byte from `source` is copied to `sink`.
pub async fn bridge<R, W>(config: &NodeConfig, source: R, sink: W) -> Result<DuplexRelay, NodeError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let log = traffic_log(config, BRIDGE_LOG).await?;
    Ok(DuplexRelay::one_way(LocalBridge::new("bridge", source, sink, log).run()))
}

/// Send one radio on/off command to the replay device.
pub async fn send_command(serial_config: &SerialConfig, command: RadioCommand) -> Result<(), NodeError> {
    let serial_config = serial_config.clone();
    tokio::task::spawn_blocking(move || serial::write_command(&serial_config, command)).await??;
    Ok(())
}
