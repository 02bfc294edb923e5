//! # Rotor CLI
//!
//! Command-line tool for the drone UDP command link.
//!
//! ```bash
//! # check that the drone is reachable
//! rotor-cli probe
//!
//! # hover test: stream 30% thrust for five seconds
//! rotor-cli run --thrust 30 --duration 5
//!
//! # speak the JSON bridge protocol over stdin/stdout
//! rotor-cli bridge
//! ```

use std::io::BufRead;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rotor_link::{DroneLink, LinkConfig};
use rotor_protocol::Command;

#[derive(Parser, Debug)]
#[command(name = "rotor-cli")]
#[command(about = "Command-line tool for the drone UDP command link", long_about = None)]
#[command(version)]
struct Cli {
    /// Drone address, ip:port
    #[arg(long, global = true)]
    drone: Option<SocketAddr>,

    /// Local UDP port to bind
    #[arg(long, global = true)]
    local_port: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect, verify reachability, disconnect
    Probe,

    /// Connect and stream a fixed command until Ctrl-C (or --duration)
    Run {
        /// Thrust percentage, 0-100
        #[arg(long, default_value_t = 0.0)]
        thrust: f32,

        /// Roll target in degrees
        #[arg(long, default_value_t = 0.0)]
        roll: f32,

        /// Pitch target in degrees
        #[arg(long, default_value_t = 0.0)]
        pitch: f32,

        /// Yaw rate target in degrees per second
        #[arg(long, default_value_t = 0.0)]
        yaw: f32,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Read JSON bridge messages from stdin, write status updates to stdout
    Bridge,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = LinkConfig::default();
    if let Some(drone) = cli.drone {
        config.drone_addr = drone;
    }
    if let Some(port) = cli.local_port {
        config.local_port = port;
    }

    match cli.command {
        Commands::Probe => probe(config),
        Commands::Run {
            thrust,
            roll,
            pitch,
            yaw,
            duration,
        } => run_stream(
            config,
            Command {
                thrust,
                roll,
                pitch,
                yaw,
            },
            duration,
        ),
        Commands::Bridge => run_bridge(config),
    }
}

fn probe(config: LinkConfig) -> Result<()> {
    let drone = config.drone_addr;
    let link = DroneLink::open(config).context("Failed to open the UDP transport")?;
    let rx = link.subscribe();
    // discard the initial replay, wait for the probe's verdict
    let _ = rx.recv_timeout(Duration::from_millis(200));

    link.connect()?;
    let status = rx
        .recv_timeout(Duration::from_secs(2))
        .context("No response from the link")?;
    if !status.connected {
        bail!(
            "Drone at {} is not reachable: {}",
            drone,
            status.error.unwrap_or_else(|| "unknown error".into())
        );
    }
    println!("Drone at {} is reachable", drone);
    link.disconnect()?;
    Ok(())
}

fn run_stream(config: LinkConfig, command: Command, duration: Option<f64>) -> Result<()> {
    let link = DroneLink::open(config).context("Failed to open the UDP transport")?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::Release))
            .context("Failed to install the Ctrl-C handler")?;
    }

    link.connect()?;
    link.send_command(command)?;
    info!(
        thrust = command.thrust,
        roll = command.roll,
        pitch = command.pitch,
        yaw = command.yaw,
        "Streaming, Ctrl-C to stop"
    );

    let deadline = duration.map(|secs| Instant::now() + Duration::from_secs_f64(secs));
    while !stop.load(Ordering::Acquire) {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                break;
            }
        }
        thread::sleep(Duration::from_millis(50));
    }

    // cut thrust before walking away
    link.send_command_flush(Command::neutral())?;
    thread::sleep(Duration::from_millis(100));
    link.disconnect()?;
    info!(sent = link.metrics().sends_succeeded, "Stopped");
    Ok(())
}

/// Speak the UI bridge protocol: one JSON message per stdin line in, one
/// JSON status update per stdout line out.
fn run_bridge(config: LinkConfig) -> Result<()> {
    let link = DroneLink::open(config).context("Failed to open the UDP transport")?;

    let rx = link.subscribe();
    let printer = thread::spawn(move || {
        while let Ok(status) = rx.recv() {
            let line = serde_json::json!({
                "type": "connection-status",
                "connected": status.connected,
                "error": status.error,
            });
            println!("{}", line);
        }
    });

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        link.handle_bridge_json(&line)?;
    }

    link.disconnect()?;
    drop(link); // closes the status channel, ends the printer
    let _ = printer.join();
    Ok(())
}
