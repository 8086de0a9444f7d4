//! Teleop Console
//!
//! Reads operator commands from stdin, one per line, and sends the resulting
//! robot commands over the configured transport. Inbound telemetry comes from
//! the transport (zenoh) or from `@telemetry <json>` lines.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use teleop_bridge::{BridgeConfig, Console, JsonLinesTransport, TeleopBridge, Transport, TransportKind};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "teleop-console")]
#[command(about = "Operator console for a teleoperated mobile manipulator")]
#[command(version)]
struct Args {
    /// Path to the console configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Show debug output
    #[arg(short, long)]
    verbose: bool,

    /// Pretty-print outbound JSON (stdout transport only)
    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn config_path(&self) -> Option<String> {
        self.config
            .clone()
            .or_else(|| std::env::var("TELEOP_CONFIG").ok())
    }
}

fn load_config(args: &Args) -> Result<BridgeConfig> {
    match args.config_path() {
        Some(path) => {
            info!("Using config: {}", path);
            BridgeConfig::load(&path).with_context(|| format!("Failed to load config {}", path))
        }
        None => {
            info!("No config given, using defaults");
            Ok(BridgeConfig::default())
        }
    }
}

/// Build the outbound transport. Inbound payloads from the channel are
/// forwarded to `inbound`.
fn open_transport(
    config: &BridgeConfig,
    pretty: bool,
    inbound: mpsc::UnboundedSender<String>,
) -> Result<Arc<dyn Transport>> {
    match config.transport.kind() {
        TransportKind::Stdout => {
            drop(inbound);
            let transport = if pretty || config.transport.pretty() {
                JsonLinesTransport::pretty()
            } else {
                JsonLinesTransport::new()
            };
            Ok(Arc::new(transport))
        }
        #[cfg(feature = "zenoh-integration")]
        TransportKind::Zenoh => {
            let prefix = config.transport.key_prefix();
            let transport = teleop_bridge::ZenohTransport::open(&prefix, move |payload| {
                if inbound.send(payload).is_err() {
                    warn!("Console closed, dropping telemetry");
                }
            })
            .context("Failed to open zenoh transport")?;
            info!("Zenoh transport on {}/command, {}/telemetry", prefix, prefix);
            Ok(Arc::new(transport))
        }
        #[cfg(not(feature = "zenoh-integration"))]
        TransportKind::Zenoh => {
            drop(inbound);
            anyhow::bail!("zenoh transport requires the zenoh-integration feature")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "teleop_bridge=debug,teleop_console=debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Teleop Console");
    info!("{}", "=".repeat(50));

    let config = load_config(&args)?;
    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<String>();
    let transport = open_transport(&config, args.pretty, inbound_tx)?;
    let mut console = Console::new(TeleopBridge::with_config(transport, &config));

    console.bridge_mut().reconciler_mut().register_observer(|limits, collisions| {
        for (joint, (lower, upper)) in limits {
            info!("{} within limits: lower={} upper={}", joint, lower, upper);
        }
        for (joint, (lower, upper)) in collisions {
            warn!("{} collision state: lower={} upper={}", joint, lower, upper);
        }
    });

    info!("Ready for commands (type @help)");

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("End of input");
                    break;
                };
                if line.trim().is_empty() || line.trim_start().starts_with('#') {
                    continue;
                }
                if let Err(e) = console.execute_line(&line) {
                    error!("{}", e);
                }
            }
            Some(payload) = inbound_rx.recv() => {
                console.bridge_mut().handle_inbound(&payload);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    if console.live_motions() > 0 {
        let stopped = console.stop_all().context("Failed to stop live motions")?;
        info!("Stopped {} live motion(s)", stopped);
    }
    Ok(())
}
