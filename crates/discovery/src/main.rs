//! tm-discover
//!
//! Waits for a tracking module to attach and reports it, or streams
//! attach/detach events until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use common::{PresenceEvent, setup_logging};
use discovery::config::{self, DiscoveryConfig};
use discovery::{
    BackendDeviceGroup, DiscoveryContext, EnumerationContext, UsbTrackingRuntime, discover_async,
    global,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "tm-discover")]
#[command(author, version, about = "Discover tracking modules attached over USB")]
#[command(long_about = "
Watches libusb hot-plug events for tracking modules and reports the attached
device once its firmware is up.

EXAMPLES:
    # Wait up to the configured number of rounds for a device
    tm-discover

    # Give up after three rounds
    tm-discover --rounds 3

    # Print attach/detach events until Ctrl-C
    tm-discover --watch

CONFIGURATION:
    1. Path specified with --config
    2. ~/.config/tm-discovery/discovery.toml
    3. /etc/tm-discovery/discovery.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Number of one-interval discovery rounds
    #[arg(short, long, value_name = "N")]
    rounds: Option<u32>,

    /// Stream presence events until interrupted
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = DiscoveryConfig::default();
        let path = DiscoveryConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let mut config = if let Some(ref path) = args.config {
        config::load_config(path).context("Failed to load configuration")?
    } else {
        DiscoveryConfig::load_or_default()
    };

    if let Some(rounds) = args.rounds {
        config.discovery.rounds = rounds.clamp(1, config::MAX_ROUNDS);
    }

    let log_level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("tm-discover v{}", env!("CARGO_PKG_VERSION"));

    let runtime = UsbTrackingRuntime::from_patterns(&config.usb.filters)
        .context("Invalid USB filters")?;
    let context =
        global::start(&runtime, config.discovery.clone()).context("Failed to start discovery")?;

    let result = if args.watch {
        run_watch(context).await
    } else {
        run_discover(context).await
    };

    info!("Shutting down discovery...");
    global::stop();

    if let Err(ref e) = result {
        error!("{:#}", e);
    }
    result
}

async fn run_discover(context: Arc<DiscoveryContext>) -> Result<()> {
    let timeout = context.settings().discovery_timeout();
    let ctx = Arc::new(EnumerationContext::new("tm-discover"));

    let found = discover_async(context, ctx.clone(), BackendDeviceGroup::default())
        .await
        .context("Discovery failed")?;

    match found.first() {
        Some(info) => {
            let device = info.create_device(ctx, false);
            println!(
                "Tracking device {} (runtime {})",
                device.handle(),
                device.runtime_version()
            );
        }
        None => {
            println!("No tracking device found within {:?}.", timeout);
        }
    }

    Ok(())
}

async fn run_watch(context: Arc<DiscoveryContext>) -> Result<()> {
    let events = context.subscribe();

    for device in context.query_devices() {
        println!("present  {}", device);
    }

    loop {
        tokio::select! {
            event = events.recv_event() => {
                match event.context("Presence channel closed")? {
                    PresenceEvent::Attached { device } => println!("attached {}", device),
                    PresenceEvent::Detached { device: Some(device) } => {
                        println!("detached {}", device)
                    }
                    PresenceEvent::Detached { device: None } => println!("detached"),
                    PresenceEvent::Error { code, device } => {
                        println!("error    {} ({:?})", code, device)
                    }
                }
            }
            _ = signal::ctrl_c() => {
                info!("Interrupted");
                return Ok(());
            }
        }
    }
}
