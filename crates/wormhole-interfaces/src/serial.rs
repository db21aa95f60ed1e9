//! Serial port access.
//!
//! The port is blocking, so [`open`] runs one reader thread and one writer
//! thread and hands the caller an in-memory async stream. Relays then treat a
//! serial device exactly like any other `AsyncRead + AsyncWrite` endpoint.
//! When the device fails the stream reports end of file; when the caller drops
//! the stream both threads exit.

use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity as SpParity, SerialPort, StopBits};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tracing::{debug, info, warn};

use wormhole_core::RadioCommand;

use crate::error::InterfaceError;

/// Serial read timeout. Bounds how long the reader thread takes to notice
/// that the stream was dropped.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Capacity of the in-memory pipe between the port threads and the runtime.
const PIPE_CAPACITY: usize = 4096;

const READ_CHUNK: usize = 256;

/// Parity setting for serial port configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

/// Line settings for one serial port. Defaults to 115200 8N1 without flow
/// control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    pub flow_control: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".into(),
            baud_rate: 115_200,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            flow_control: false,
        }
    }
}

impl SerialConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    /// Reject settings the port driver cannot express.
    pub fn validate(&self) -> Result<(), InterfaceError> {
        if self.port.is_empty() {
            return Err(InterfaceError::Configuration("serial port path is empty".into()));
        }
        if self.baud_rate == 0 {
            return Err(InterfaceError::Configuration("baud rate must be positive".into()));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(InterfaceError::Configuration(format!(
                "data bits must be 5-8, got {}",
                self.data_bits
            )));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(InterfaceError::Configuration(format!(
                "stop bits must be 1 or 2, got {}",
                self.stop_bits
            )));
        }
        Ok(())
    }
}

pub fn to_serialport_parity(p: Parity) -> SpParity {
    match p {
        Parity::None => SpParity::None,
        Parity::Odd => SpParity::Odd,
        Parity::Even => SpParity::Even,
    }
}

pub fn to_serialport_data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

pub fn to_serialport_stop_bits(bits: u8) -> StopBits {
    match bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}

fn to_serialport_flow_control(enabled: bool) -> FlowControl {
    if enabled {
        FlowControl::Hardware
    } else {
        FlowControl::None
    }
}

/// Open the port with the configured line settings and discard anything
/// already buffered in either direction.
pub fn open_port(config: &SerialConfig) -> Result<Box<dyn SerialPort>, InterfaceError> {
    config.validate()?;

    let port = serialport::new(&config.port, config.baud_rate)
        .data_bits(to_serialport_data_bits(config.data_bits))
        .parity(to_serialport_parity(config.parity))
        .stop_bits(to_serialport_stop_bits(config.stop_bits))
        .flow_control(to_serialport_flow_control(config.flow_control))
        .timeout(READ_TIMEOUT)
        .open()?;
    port.clear(ClearBuffer::All)?;

    info!(
        "serial: opened {} at {} baud ({}{}{})",
        config.port,
        config.baud_rate,
        config.data_bits,
        match config.parity {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        },
        config.stop_bits
    );
    Ok(port)
}

/// Open the port and bridge it to an async stream.
///
/// Must be called from within a tokio runtime.
pub fn open(config: &SerialConfig) -> Result<DuplexStream, InterfaceError> {
    let port = open_port(config)?;
    bridge(port, config.port.clone())
}

/// Open the port for writing only.
///
/// Bytes the device sends are read and thrown away, so the reader thread keeps
/// watching the port and the stream still reports end of file on detach.
pub fn open_sink(config: &SerialConfig) -> Result<DuplexStream, InterfaceError> {
    let port = open_port(config)?;
    bridge_with(port, config.port.clone(), Input::Discard)
}

/// Bridge an already opened port to an async stream.
pub fn bridge(port: Box<dyn SerialPort>, name: String) -> Result<DuplexStream, InterfaceError> {
    bridge_with(port, name, Input::Forward)
}

/// What the reader thread does with bytes from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Forward,
    Discard,
}

/// Bridge an already opened port, choosing whether device input reaches the
/// stream.
pub fn bridge_with(
    mut port: Box<dyn SerialPort>,
    name: String,
    input: Input,
) -> Result<DuplexStream, InterfaceError> {
    let handle = tokio::runtime::Handle::try_current()
        .map_err(|e| InterfaceError::Configuration(format!("no async runtime: {e}")))?;
    port.set_timeout(READ_TIMEOUT)?;
    let writer_port = port.try_clone()?;

    let (app_side, device_side) = tokio::io::duplex(PIPE_CAPACITY);
    let (mut from_app, mut to_app) = tokio::io::split(device_side);
    let stop = Arc::new(AtomicBool::new(false));

    let reader_handle = handle.clone();
    let reader_stop = stop.clone();
    let reader_name = name.clone();
    let mut reader_port = port;
    std::thread::Builder::new()
        .name(format!("serial-rx {name}"))
        .spawn(move || {
            let mut buf = [0u8; READ_CHUNK];
            while !reader_stop.load(Ordering::SeqCst) {
                match reader_port.read(&mut buf) {
                    Ok(0) => {
                        warn!("serial: {} reported end of stream", reader_name);
                        break;
                    }
                    Ok(n) => {
                        if input == Input::Discard {
                            continue;
                        }
                        if reader_handle.block_on(to_app.write_all(&buf[..n])).is_err() {
                            break;
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(e) => {
                        warn!("serial: read error on {}: {}", reader_name, e);
                        break;
                    }
                }
            }
            reader_stop.store(true, Ordering::SeqCst);
            let _ = reader_handle.block_on(to_app.shutdown());
            debug!("serial: reader for {} exited", reader_name);
        })?;

    let writer_stop = stop;
    let mut writer_port = writer_port;
    std::thread::Builder::new()
        .name(format!("serial-tx {name}"))
        .spawn(move || {
            let mut buf = [0u8; READ_CHUNK];
            loop {
                let n = match handle.block_on(from_app.read(&mut buf)) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                if let Err(e) = write_blocking(writer_port.as_mut(), &buf[..n], &writer_stop) {
                    warn!("serial: write error on {}: {}", name, e);
                    break;
                }
            }
            writer_stop.store(true, Ordering::SeqCst);
            debug!("serial: writer for {} exited", name);
        })?;

    Ok(app_side)
}

/// Write all of `data`, waiting out port timeouts for as long as the device
/// is stalled. Gives up only on a real error or once `stop` is set.
fn write_blocking(port: &mut dyn SerialPort, data: &[u8], stop: &AtomicBool) -> std::io::Result<()> {
    let mut written = 0;
    while written < data.len() {
        match port.write(&data[written..]) {
            Ok(0) => return Err(std::io::ErrorKind::WriteZero.into()),
            Ok(n) => written += n,
            Err(e) if is_retryable(&e) && !stop.load(Ordering::SeqCst) => {}
            Err(e) => return Err(e),
        }
    }
    loop {
        match port.flush() {
            Ok(()) => return Ok(()),
            Err(e) if is_retryable(&e) && !stop.load(Ordering::SeqCst) => {}
            Err(e) => return Err(e),
        }
    }
}

fn is_retryable(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
    )
}

/// Open the port, send one radio command, and close it again.
///
/// Blocking; call from `spawn_blocking` inside a runtime.
pub fn write_command(config: &SerialConfig, command: RadioCommand) -> Result<(), InterfaceError> {
    let mut port = open_port(config)?;
    let encoded = command.encode();
    port.write_all(&encoded).map_err(InterfaceError::LocalIo)?;
    port.flush().map_err(InterfaceError::LocalIo)?;
    info!(
        "serial: sent radio command {} to {} ({})",
        command,
        config.port,
        hex::encode(encoded)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_115200_8n1() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.data_bits, 8);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, 1);
        assert!(!config.flow_control);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = SerialConfig::new("");
        assert!(matches!(config.validate(), Err(InterfaceError::Configuration(_))));

        config.port = "/dev/ttyS0".into();
        config.data_bits = 9;
        assert!(config.validate().is_err());

        config.data_bits = 8;
        config.stop_bits = 3;
        assert!(config.validate().is_err());

        config.stop_bits = 1;
        config.baud_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parity_deserializes_lowercase() {
        use serde::de::IntoDeserializer;
        let de: serde::de::value::StrDeserializer<'_, serde::de::value::Error> =
            "even".into_deserializer();
        assert_eq!(Parity::deserialize(de).unwrap(), Parity::Even);
    }

    #[test]
    fn test_to_serialport_conversions() {
        assert!(matches!(to_serialport_parity(Parity::Odd), SpParity::Odd));
        assert!(matches!(to_serialport_data_bits(7), DataBits::Seven));
        assert!(matches!(to_serialport_data_bits(9), DataBits::Eight));
        assert!(matches!(to_serialport_stop_bits(2), StopBits::Two));
        assert!(matches!(to_serialport_stop_bits(0), StopBits::One));
        assert!(matches!(to_serialport_flow_control(true), FlowControl::Hardware));
    }

    #[test]
    fn test_open_missing_port_fails() {
        let config = SerialConfig::new("/dev/does-not-exist-wormhole");
        assert!(matches!(open_port(&config), Err(InterfaceError::Serial(_))));
    }

    #[cfg(unix)]
    mod pty {
        use std::time::{Duration, Instant};

        use serialport::TTYPort;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        use super::super::*;

        /// Read from the device end until `len` bytes arrived or the deadline
        /// passed.
        fn drain(device: &mut TTYPort, len: usize) -> Vec<u8> {
            let deadline = Instant::now() + Duration::from_secs(10);
            let mut received = Vec::with_capacity(len);
            let mut buf = [0u8; 1024];
            while received.len() < len && Instant::now() < deadline {
                match device.read(&mut buf) {
                    Ok(n) => received.extend_from_slice(&buf[..n]),
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(e) => panic!("device read failed: {e}"),
                }
            }
            received
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn test_stalled_device_delays_writes_without_failing() {
            let (master, mut device) = TTYPort::pair().unwrap();
            let mut stream = bridge(Box::new(master), "pty".into()).unwrap();

            let payload: Vec<u8> = (0..65_536u32).map(|i| (i % 251) as u8).collect();
            let expected = payload.clone();
            let reader = tokio::task::spawn_blocking(move || {
                // Hold the device well past the port timeout before reading.
                std::thread::sleep(Duration::from_millis(300));
                drain(&mut device, expected.len())
            });

            tokio::time::timeout(Duration::from_secs(10), stream.write_all(&payload))
                .await
                .expect("write to the stalled device never completed")
                .unwrap();
            let received = reader.await.unwrap();
            assert_eq!(received.len(), payload.len());
            assert_eq!(received, payload);
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn test_discarded_input_does_not_hide_detach() {
            let (master, mut device) = TTYPort::pair().unwrap();
            device.set_timeout(Duration::from_secs(1)).unwrap();
            let mut stream = bridge_with(Box::new(master), "pty".into(), Input::Discard).unwrap();

            // More than the pipe holds; nobody reads it on the app side.
            let chatter = vec![0x55u8; 4 * PIPE_CAPACITY];
            let device = tokio::task::spawn_blocking(move || {
                for chunk in chatter.chunks(1024) {
                    device.write_all(chunk).unwrap();
                }
                device
            })
            .await
            .unwrap();

            stream.write_all(b"ctrl1").await.unwrap();
            let mut device = device;
            let echoed = tokio::task::spawn_blocking(move || {
                let got = drain(&mut device, 5);
                drop(device);
                got
            })
            .await
            .unwrap();
            assert_eq!(echoed, b"ctrl1");

            let mut buf = [0u8; 16];
            let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
                .await
                .expect("detach was never reported")
                .unwrap();
            assert_eq!(n, 0);
        }
    }
}
