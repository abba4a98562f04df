//! # tape-consume
//!
//! Queue consumer: reads window summaries from the durable queue and
//! acknowledges each message only after it has been processed — an unacked
//! message is redelivered if this process dies mid-way.
//!
//! # Usage
//!
//! ```bash
//! tape-consume config.json
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use futures_util::StreamExt;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Connection, ConnectionProperties};
use tape_core::WindowSummary;
use tracing::{info, warn};

/// Window summary queue consumer.
#[derive(Parser)]
#[command(name = "tape-consume", about = "Window summary queue consumer")]
struct Cli {
    /// Configuration file path (JSON) — only the broker section is used.
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

    tape_core::logging::init_logging(&cli.log_level, cli.log_dir.as_deref(), "tape-consume");

    let config = tape_core::config::load_config(&cli.config)?;
    let broker = &config.broker;

    let connection = Connection::connect(&broker.amqp_uri(), ConnectionProperties::default()).await?;
    let channel = connection.create_channel().await?;
    channel
        .queue_declare(
            &broker.queue,
            QueueDeclareOptions { durable: true, ..Default::default() },
            FieldTable::default(),
        )
        .await?;

    let mut consumer = channel
        .basic_consume(
            &broker.queue,
            "tape-consume",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    info!("consuming from '{}' — press Ctrl+C to stop", broker.queue);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }

            delivery = consumer.next() => {
                let Some(delivery) = delivery else {
                    warn!("consume stream ended");
                    break;
                };
                let delivery = delivery?;
                match WindowSummary::from_wire(&delivery.data) {
                    Ok(summary) => info!("received {summary}"),
                    Err(e) => warn!("ignoring undecodable message: {e}"),
                }
                // Ack only after processing.
                delivery.ack(BasicAckOptions::default()).await?;
            }
        }
    }

    connection.close(200, "shutdown").await?;
    Ok(())
}
