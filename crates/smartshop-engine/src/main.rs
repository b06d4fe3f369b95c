//! SmartShop event generator binary.
//!
//! Simulates concurrent shopping sessions and publishes their check-in,
//! basket and check-out events to NATS until it receives Ctrl-C or SIGTERM.
//! On shutdown every open session is checked out before the process exits.
//!
//! # Startup Sequence
//!
//! 1. Parse the command line
//! 2. Initialize structured logging (tracing)
//! 3. Load and validate `config/localhost.yaml` (or `--config`)
//! 4. Seed the generator
//! 5. Install the signal listener
//! 6. Connect to NATS, unless `--dry-run`
//! 7. Run the tick loop until shutdown
//! 8. Flush the producer and log the run totals

mod error;
mod nats_sink;
mod signals;

use std::path::PathBuf;

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use smartshop_core::config::AppConfig;
use smartshop_core::runner;
use smartshop_core::shutdown::ShutdownSignal;
use smartshop_core::simulation::Simulation;
use smartshop_core::sink::DryRunSink;
use smartshop_types::Topic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::nats_sink::NatsSink;

/// Synthetic SmartShop event generator.
#[derive(Parser, Debug)]
#[command(name = "smartshop-engine")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "config/localhost.yaml")]
    config: PathBuf,

    /// Log every emitted payload.
    #[arg(short, long)]
    verbose: bool,

    /// Run the simulation without connecting to NATS.
    #[arg(long)]
    dry_run: bool,

    /// Seed for the simulation generator; overrides `seed` in the config.
    #[arg(long)]
    seed: Option<u64>,
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid or NATS is unreachable.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(true)
        .init();

    info!(config = %cli.config.display(), dry_run = cli.dry_run, "smartshop-engine starting");

    let config = AppConfig::from_file(&cli.config).map_err(EngineError::from)?;
    let params = config.smartshop.validate().map_err(EngineError::from)?;
    info!(
        max_skus = params.ids.max_skus.get(),
        max_shops = params.ids.max_shops.get(),
        max_clients = params.ids.max_clients.get(),
        max_simultaneous_sessions = params.max_simultaneous_sessions.get(),
        max_transactions_per_second = params.max_transactions_per_second,
        max_basket_size = params.max_basket_size.get(),
        "Configuration loaded"
    );

    let rng = match cli.seed.or(config.seed) {
        Some(seed) => {
            info!(seed, "Seeding simulation generator");
            SmallRng::seed_from_u64(seed)
        }
        None => SmallRng::from_os_rng(),
    };
    let mut simulation = Simulation::new(params, rng);

    let shutdown = ShutdownSignal::new();
    let _signal_handle = signals::spawn_listener(shutdown.clone());

    let summary = if cli.dry_run {
        let mut sink = DryRunSink::new();
        let summary = runner::run_simulation(&mut simulation, &mut sink, &shutdown).await;
        info!(
            checkin = sink.count(Topic::Checkin),
            basket = sink.count(Topic::Basket),
            checkout = sink.count(Topic::Checkout),
            "Dry-run completed, bye bye"
        );
        summary
    } else {
        info!(url = config.nats.url, "Connecting to NATS");
        let mut sink = NatsSink::connect(config.nats.clone()).await?;
        info!("NATS producer connected");

        let summary = runner::run_simulation(&mut simulation, &mut sink, &shutdown).await;

        info!("Flushing NATS producer");
        sink.close().await?;
        info!("NATS producer completed, bye bye");
        summary
    };

    runner::log_run_end(&summary);
    Ok(())
}
