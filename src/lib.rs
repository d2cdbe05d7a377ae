pub mod config;
pub mod error;
pub mod feedback;
pub mod host;
pub mod pose;
pub mod tracking;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use config::TrackerConfig;
use tracking::TrackingController;

pub use error::TrackingError;

/// Entry point for the `posetrack` binary: sets up logging, loads config from
/// the optional path argument and serves commands on stdin/stdout.
pub async fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var). Logs go to stderr; stdout carries the protocol.
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("posetrack starting up...");

    let config = match std::env::args().nth(1) {
        Some(path) => TrackerConfig::load(&PathBuf::from(path))?,
        None => TrackerConfig::from_env(),
    };
    log::info!(
        "Tick interval {}ms, seed {:?}",
        config.tick_interval_ms,
        config.rng_seed
    );

    let controller = TrackingController::new(config);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    host::serve(controller, stdin, tokio::io::stdout()).await
}
