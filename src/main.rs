//! Selfie kiosk: arms a countdown from a held gesture or smile, then captures and publishes.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use selfie_kiosk::{
    app::{AppConfig, KioskApp},
    cli::Args,
    config::{Config, EXAMPLE_CONFIG},
};

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Selfie Kiosk v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration if provided
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Config::default(),
    };
    args.apply_to(&mut config);
    config.validate().context("invalid configuration")?;

    let mut app_config = AppConfig::from_config(&config);
    app_config.debug = args.debug;

    // Create and run application
    let mut app = KioskApp::new(&config, app_config).context("failed to start the kiosk")?;
    app.run()?;

    Ok(())
}
