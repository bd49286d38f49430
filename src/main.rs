//! tuntap-relay: create two TUN/TAP interfaces and relay frames between them
//!
//! Usage:
//!   tuntap-relay --interface1 sdr_tap0 --interface2 sdr_tap1
//!   tuntap-relay --tun --ip1 10.1.0.1 --ip2 10.2.0.1 --netmask 255.255.0.0
//!
//! Creating the devices requires root or CAP_NET_ADMIN.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tuntap_relay::{EndpointConfig, Mode, Relay, RelayConfig, ShutdownSignal, VirtualInterface};

#[derive(Parser, Debug)]
#[command(name = "tuntap-relay")]
#[command(about = "Relay frames between two virtual network interfaces", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Use TUN interfaces instead of TAP
    #[arg(long)]
    tun: bool,

    /// Name of first interface
    #[arg(long, default_value = "sdr_tap0")]
    interface1: String,

    /// Name of second interface
    #[arg(long, default_value = "sdr_tap1")]
    interface2: String,

    /// IP address for first interface
    #[arg(long, default_value = "192.168.10.1")]
    ip1: String,

    /// IP address for second interface
    #[arg(long, default_value = "192.168.20.1")]
    ip2: String,

    /// Netmask for both interfaces
    #[arg(long, default_value = "255.255.255.0")]
    netmask: String,

    /// Seconds between statistics reports (0 disables them)
    #[arg(long, default_value_t = 10)]
    stats_interval: u64,

    /// Enable verbose logging (per-packet dumps)
    #[arg(short, long)]
    verbose: bool,
}

impl From<Cli> for RelayConfig {
    fn from(cli: Cli) -> Self {
        RelayConfig {
            mode: if cli.tun { Mode::Tun } else { Mode::Tap },
            first: EndpointConfig::new(cli.interface1, cli.ip1),
            second: EndpointConfig::new(cli.interface2, cli.ip2),
            netmask: cli.netmask,
            stats_interval: (cli.stats_interval > 0)
                .then(|| Duration::from_secs(cli.stats_interval)),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise --verbose selects debug
    let fallback = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .ok();

    let config = RelayConfig::from(cli);
    run(config).await
}

async fn run(config: RelayConfig) -> Result<()> {
    let (first_addr, second_addr) = config.validate().context("Invalid configuration")?;
    info!(mode = %config.mode, "using {} interfaces", config.mode);

    let first = Arc::new(VirtualInterface::new(&config.first.name, config.mode));
    let second = Arc::new(VirtualInterface::new(&config.second.name, config.mode));

    info!("initializing interfaces");
    first
        .initialize()
        .map_err(privilege_hint)
        .context("Failed to initialize first interface")?;
    second
        .initialize()
        .map_err(privilege_hint)
        .context("Failed to initialize second interface")?;

    info!("configuring interfaces");
    first
        .configure_address(first_addr)
        .map_err(privilege_hint)
        .context("Failed to configure first interface")?;
    second
        .configure_address(second_addr)
        .map_err(privilege_hint)
        .context("Failed to configure second interface")?;

    let shutdown = ShutdownSignal::new();
    let relay = Relay::wire(Arc::clone(&first), Arc::clone(&second), shutdown.clone())
        .context("Failed to start packet capture")?;

    info!(
        "relay running, try: ping {} -I {} (or iperf3 for throughput); press Ctrl+C to stop",
        second_addr.address, first_addr.address
    );

    let stats_interval = config.stats_interval;
    let runner = tokio::task::spawn_blocking(move || relay.run_until_shutdown(stats_interval));

    // Fire the signal even if waiting failed, so the relay thread always drains.
    let waited = wait_for_signal().await;
    shutdown.trigger();

    let stats = runner.await.context("Relay task failed")?;
    waited?;
    info!(
        first = %first.name(),
        second = %second.name(),
        captured = stats.first.frames_received + stats.second.frames_received,
        dropped = stats.first.frames_dropped + stats.second.frames_dropped,
        "shutdown complete"
    );
    Ok(())
}

fn privilege_hint(err: tuntap_relay::Error) -> tuntap_relay::Error {
    if err.is_environmental() {
        warn!("creating and configuring TUN/TAP devices requires root or CAP_NET_ADMIN");
    }
    err
}

async fn wait_for_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
    }
    Ok(())
}
