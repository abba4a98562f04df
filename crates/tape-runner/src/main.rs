//! # tape-runner
//!
//! Main entry point for the trade aggregation pipeline.
//!
//! Loads a JSON configuration file, starts the pipeline, runs until
//! interrupted, then shuts down cleanly (partial window flushed, broker
//! connection released).
//!
//! # Usage
//!
//! ```bash
//! tape-runner config.json --log-level info
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Trade feed aggregation pipeline runner.
#[derive(Parser)]
#[command(name = "tape-runner", about = "Trade feed aggregation pipeline")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Initialize logging
    tape_core::logging::init_logging(&cli.log_level, cli.log_dir.as_deref(), "tape-runner");

    info!("tape-runner starting — config={}, log_level={}", cli.config.display(), cli.log_level);

    // 2. Load configuration (validation failures are fatal here)
    let config = tape_core::config::load_config(&cli.config)?;
    info!(
        "config loaded — module '{}', {} pair(s)",
        config.module_name(),
        config.feed.pairs.len()
    );

    // 3. Start the pipeline
    let pipeline = tape_agg::pipeline::Pipeline::start(&config).await?;

    info!("pipeline running — press Ctrl+C to stop");

    // 4. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    // 5. Stop cleanly
    pipeline.stop().await;

    info!("goodbye");
    Ok(())
}
