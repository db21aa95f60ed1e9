use std::path::PathBuf;

use clap::{Parser, Subcommand};

use wormhole_core::RadioCommand;
use wormhole_interfaces::serial;
use wormhole_node::{DuplexRelay, NodeConfig, NodeError, modes};

#[derive(Parser)]
#[command(name = "wormhole", version, about = "Tunnel a serial link over TCP")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Serial port, overriding the config file
    #[arg(short, long, global = true)]
    port: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Forward frames captured on the serial port to the replayer
    Sniffer,
    /// Accept frames from a sniffer and write them to the serial port
    Replayer,
    /// Raw duplex bridge, connecting to a sniplayer server
    SniplayerClient,
    /// Raw duplex bridge, waiting for a sniplayer client
    SniplayerServer,
    /// Copy bytes from the serial port to `[bridge] output_port`
    Bridge,
    /// Switch the replayer radio on or off
    Ctrl {
        /// `on` or `off`
        command: RadioCommand,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match NodeConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("failed to load config from {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => NodeConfig::default(),
    };
    if let Some(port) = cli.port {
        config.serial.port = port;
    }

    wormhole_node::logging::init_from_env(&config.logging.level);

    if let Err(e) = run(cli.command, config).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(command: Command, config: NodeConfig) -> Result<(), NodeError> {
    let relay = match command {
        Command::Ctrl { command } => return modes::send_command(&config.serial, command).await,
        Command::Sniffer => {
            let (source, _) = tokio::io::split(serial::open(&config.serial)?);
            modes::sniffer(&config, source).await?
        }
        Command::Replayer => {
            modes::replayer(&config, serial::open_sink(&config.serial)?).await?
        }
        Command::SniplayerClient => {
            modes::sniplayer_client(&config, serial::open(&config.serial)?).await?
        }
        Command::SniplayerServer => {
            modes::sniplayer_server(&config, serial::open(&config.serial)?).await?
        }
        Command::Bridge => {
            let (source, _) = tokio::io::split(serial::open(&config.serial)?);
            let sink = serial::open_sink(&config.bridge_output()?)?;
            modes::bridge(&config, source, sink).await?
        }
    };

    wait(relay).await
}

/// Run until every direction has stopped or the process is interrupted.
async fn wait(relay: DuplexRelay) -> Result<(), NodeError> {
    tokio::select! {
        reports = relay.join() => {
            let mut first_error = None;
            for report in reports? {
                tracing::info!(
                    "{}: {} forwarded, {} suppressed, {} dropped, {} bytes",
                    report.name,
                    report.stats.forwarded,
                    report.stats.suppressed,
                    report.stats.dropped,
                    report.stats.bytes
                );
                if let Err(e) = report.result {
                    first_error.get_or_insert(e);
                }
            }
            first_error.map_or(Ok(()), Err)
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down");
            Ok(())
        }
    }
}
