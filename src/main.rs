//! # Pepega - minimal Wayland shared-memory client
//!
//! Opens a single top-level window titled "Wayland Pepega" and keeps it filled
//! with a gradient, redrawing on every frame callback and resize until the
//! compositor asks the window to close.

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use std::path::Path;

use pepega::client::WaylandClient;
use pepega::config::{self, PepegaConfig};
use pepega::event_loop::{self, LoopExit};

#[derive(Parser)]
#[command(name = "pepega")]
#[command(about = "A minimal Wayland client that paints a gradient into shared-memory buffers")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/pepega/pepega.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Initial window width, overriding the configuration
    #[arg(long)]
    width: Option<u32>,

    /// Initial window height, overriding the configuration
    #[arg(long)]
    height: Option<u32>,
}

/// Read the config file. A file that does not exist is not an error.
fn load_config(path: &str) -> Result<Option<PepegaConfig>> {
    let exists = config::expand_home(Path::new(path))
        .map(|p| p.exists())
        .unwrap_or(false);
    if !exists {
        return Ok(None);
    }

    PepegaConfig::load(path).map(Some)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = load_config(&cli.config);

    // Initialize logging
    let debug = cli.debug || matches!(&loaded, Ok(Some(config)) if config.general.debug);
    let filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    info!(
        "Starting Pepega {} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT"),
        env!("BUILD_DATE")
    );

    let mut config = match loaded {
        Ok(Some(config)) => {
            info!("Configuration loaded from: {}", cli.config);
            config
        }
        Ok(None) => PepegaConfig::default(),
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            info!("Using default configuration");
            PepegaConfig::default()
        }
    };
    if let Some(width) = cli.width {
        config.window.width = width;
    }
    if let Some(height) = cli.height {
        config.window.height = height;
    }
    config.validate()?;

    let mut client = WaylandClient::connect(config.window.width, config.window.height)?;

    // Release the window even when dispatch failed
    let outcome = event_loop::run(&mut client);
    let released = client.shutdown();

    match outcome? {
        LoopExit::Closed => info!("Window closed"),
    }
    released?;

    info!("Pepega shutting down");
    Ok(())
}
