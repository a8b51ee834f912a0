//! ## buggyrace-cli
//! **Headless race replays from the terminal**
//!
//! Loads a race log and its track, replays it at race pace (or fast-forward)
//! and prints the narration as it happens.

use std::sync::Arc;

use clap::Parser;

use buggyrace_config::BuggyraceConfig;
use buggyrace_telemetry::logging::EventLogger;
use buggyrace_telemetry::metrics::MetricsRecorder;

mod commands;
mod render;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => BuggyraceConfig::load_from_path(path)?,
        None => BuggyraceConfig::load()?,
    };
    EventLogger::init(&config.telemetry.log_level);
    let metrics = Arc::new(MetricsRecorder::new());

    match cli.command {
        Commands::Replay(args) => commands::run_replay(args, config, metrics).await,
        Commands::Check(args) => commands::run_check(args).await,
    }
}
